pub mod displayd;
