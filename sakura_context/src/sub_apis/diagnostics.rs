pub trait DiagnosticsAPI {
    /// User-facing error, shown in the host's error console.
    fn push_error(&mut self, message: &str);
}
