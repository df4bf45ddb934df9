pub mod gql;
pub mod rest;
