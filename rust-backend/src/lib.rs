pub mod config;
pub mod middleware;
pub mod state;
pub mod routes {
    pub mod health;
    pub mod inference;
}
pub mod services {
    pub mod inference;
    pub mod market_data;
    pub mod model;
    pub mod normalizer;
}

pub mod utils;
