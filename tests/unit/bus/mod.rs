pub mod dispatch_test;
pub mod subscription_test;
