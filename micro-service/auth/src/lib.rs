pub mod handlers;
pub mod routes;
pub mod telemetry;

#[cfg(test)]
mod tests;
