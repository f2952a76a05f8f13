use core::fmt::Debug;

/// A fabric interrupt pin.
///
/// Delivery belongs to the platform; the resolver only creates one handle per pin and keeps it
/// for the lifetime of the node that owns the pin.
pub trait InterruptLine: Debug + Send + Sync {
    /// Full path of the pin, e.g. `iop1/mb_intr`.
    fn pin(&self) -> &str;
}
