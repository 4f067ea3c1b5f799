/// Scalar type used throughout the controllers.
pub type Float = f64;
