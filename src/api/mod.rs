//! REST endpoints outside the GraphQL surface

pub mod health;
