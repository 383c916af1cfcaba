//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Keys present in `section`, in no particular order. Empty when the
    /// section is absent.
    fn keys(&self, section: &str) -> Vec<String>;

    /// `None` when the key is absent or blank.
    fn get_optional_string(&self, section: &str, key: &str) -> Option<String> {
        self.get_string(section, key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
