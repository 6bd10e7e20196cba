//! Generated protocol types for the provider gRPC service.

tonic::include_proto!("polytomic.provider.v1");
