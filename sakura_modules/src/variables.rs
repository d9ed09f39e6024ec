use rustc_hash::FxHashMap;
use sakura_variant::Variant;

/// Named values shared between extension modules.
#[derive(Default)]
pub struct GlobalVariables {
    values: FxHashMap<String, Variant>,
}

impl GlobalVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under `name`, `Null` when unset.
    pub fn get(&self, name: &str) -> Variant {
        self.values.get(name).cloned().unwrap_or_default()
    }

    /// Store `value`, returning what was there before.
    pub fn set(&mut self, name: &str, value: impl Into<Variant>) -> Option<Variant> {
        self.values.insert(name.to_string(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Variant> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// JSON object of every variable, for debugging output.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .values
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json_value()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}
