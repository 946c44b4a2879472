//! The host side of the outbound channel.

/// Host object owning the raw outbound channel.
///
/// The router only ever calls [`post_message`](Instance::post_message) from the execution
/// context the originating request arrived on, so implementations can assume they are
/// driven from that context. The instance must outlive the router it is given to.
pub trait Instance: Send + Sync {
    /// Fire-and-forget send of one serialized message.
    fn post_message(&self, message: &str);
}

impl<F> Instance for F
where
    F: Fn(&str) + Send + Sync,
{
    fn post_message(&self, message: &str) {
        self(message)
    }
}
