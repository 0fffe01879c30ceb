use barrage_grpc_entity::benchmark_pb::{Payload, PayloadType, SimpleRequest};

use crate::error::PayloadError;

/// Payload with a body of exactly `size` bytes, the content is irrelevant for the benchmark.
pub fn payload(size: i32) -> Result<Payload, PayloadError> {
    let size = usize::try_from(size).map_err(|_| PayloadError::InvalidLength(size))?;
    Ok(Payload::zeroed(size))
}

/// Builds the [`SimpleRequest`] sent by every call of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFactory {
    payload: Payload,
    response_size: i32,
}
impl Default for RequestFactory {
    fn default() -> Self {
        Self { payload: Payload::zeroed(0), response_size: 0 }
    }
}
impl RequestFactory {
    pub fn new(request_size: i32, response_size: i32) -> Result<Self, PayloadError> {
        let payload = payload(request_size)?;
        if response_size < 0 {
            return Err(PayloadError::InvalidLength(response_size));
        }
        Ok(Self { payload, response_size })
    }

    pub fn request_size(&self) -> usize {
        self.payload.body.len()
    }
    pub fn response_size(&self) -> i32 {
        self.response_size
    }

    pub fn produce(&self) -> SimpleRequest {
        SimpleRequest {
            response_type: PayloadType::Compressable.into(),
            response_size: self.response_size,
            payload: Some(self.payload.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_size() {
        for size in [0, 1, 1024, 64 * 1024] {
            assert_eq!(payload(size).unwrap().body.len(), size as usize);
        }
    }

    #[test]
    fn test_negative_payload_size() {
        assert_eq!(payload(-1), Err(PayloadError::InvalidLength(-1)));
    }

    #[test]
    fn test_produce() {
        let factory = RequestFactory::new(1024, 16).unwrap();
        let request = factory.produce();
        assert_eq!(request.payload.unwrap().body.len(), 1024);
        assert_eq!(request.response_size, 16);
    }

    #[test]
    fn test_negative_sizes() {
        assert_eq!(RequestFactory::new(-3, 0), Err(PayloadError::InvalidLength(-3)));
        assert_eq!(RequestFactory::new(0, -5), Err(PayloadError::InvalidLength(-5)));
    }
}
