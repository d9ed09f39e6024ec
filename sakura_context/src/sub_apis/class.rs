pub trait ClassAPI {
    fn class_exists(&self, class: &str) -> bool;
}
