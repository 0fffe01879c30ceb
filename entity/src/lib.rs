//! Protocol entities of the `grpc.testing.BenchmarkService` contract shared by the load generator
//! and the development server.

pub mod benchmark_pb {
    tonic::include_proto!("grpc.testing");

    impl Payload {
        /// Body of `size` zero bytes.
        pub fn zeroed(size: usize) -> Self {
            Self { r#type: PayloadType::Compressable.into(), body: vec![0; size] }
        }
    }
}
