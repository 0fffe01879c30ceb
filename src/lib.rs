//! gRPC benchmark load generator with warmup and measurement phases
//!
//! # Binary Usage
//! ## Install
//! ```sh
//! cargo install --path .
//! ```
//!
//! ### Run API for testing
//! If you have no `grpc.testing.BenchmarkService` for testing, you can use `barrage-dev-server-grpc`
//! ```sh
//! cargo install --path dev/server/grpc
//! barrage-dev-server-grpc
//! ```
//!
//! ## Run CLI
//! ```sh
//! barrage --server_addr localhost:5000 --scenario pingpongstreaming --connections 4 --streams 8 --warmup 1 --duration 5
//! ```
//! Logs go to stderr, and two statistics blocks go to stdout.
//! ```sh
//! #StartJobStatistics
//! {"Metadata":[{"Source":"Benchmarks","Name":"grpc/rps/max",...}],"Measurements":[...]}
//! #EndJobStatistics
//! #StartJobStatistics
//! {"Metadata":[{"Source":"Benchmarks","Name":"grpc/latency/mean",...}],"Measurements":[...]}
//! #EndJobStatistics
//! ```
//! - Each connection is dialed independently, and each of its streams runs **concurrently**.
//! - Only the calls completed after the warmup and before the end of the duration are counted.
//!
//! | scenario | call |
//! | --- | --- |
//! | `unary` | `UnaryCall` repeatedly |
//! | `serverstreaming` | one `StreamingFromServer`, then receive responses repeatedly |
//! | `pingpongstreaming` | one `StreamingCall`, then send a request and receive its response repeatedly |
//!
//! # Library Usage
//! ```no_run
//! use barrage::interface::command::Barrage;
//!
//! #[tokio::main]
//! async fn main() -> barrage::Result<()> {
//!     let cmd = Barrage { server_addr: "localhost:5000".to_string(), warmup: 0, duration: 1, ..Default::default() };
//!     let summary = cmd.run(std::io::stdout()).await?;
//!     assert_eq!(summary.failures, 0);
//!     Ok(())
//! }
//! ```

pub mod assault;
pub mod error;
pub mod interface;

pub use {error::BarrageError as Error, error::BarrageResult as Result};
