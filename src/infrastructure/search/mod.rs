mod google;

pub use google::GoogleSearch;
