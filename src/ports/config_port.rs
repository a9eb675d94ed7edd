//! Configuration access port.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Raw numeric value, distinguishing "absent" from "unparseable".
    fn get_f64(&self, section: &str, key: &str) -> Option<Result<f64, String>> {
        let raw = self.get_string(section, key)?;
        Some(
            raw.trim()
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", raw.trim())),
        )
    }
}
