pub mod variant;
pub use variant::*;

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn null_is_default() {
        assert!(Variant::default().is_null());
        assert_eq!(Variant::default().type_name(), "Nil");
    }

    #[test]
    fn accessors_match_only_their_variant() {
        assert_eq!(Variant::from("hello").as_str(), Some("hello"));
        assert_eq!(Variant::from(vec![1u8, 2, 3]).as_bytes(), Some(&[1u8, 2, 3][..]));
        assert_eq!(Variant::from(true).as_bool(), Some(true));
        assert_eq!(Variant::from(7).as_i64(), Some(7));
        assert_eq!(Variant::from(7).as_f64(), Some(7.0));
        assert_eq!(Variant::from(1.5f32).as_i64(), None);
        assert_eq!(Variant::from("x").as_bool(), None);
    }

    #[test]
    fn dictionary_mutation() {
        let mut v = Variant::from(BTreeMap::new());
        v.as_dictionary_mut()
            .unwrap()
            .insert("hp".to_string(), Variant::from(10));
        assert_eq!(v.as_dictionary().unwrap().len(), 1);
        assert_eq!(v.type_name(), "Dictionary");
    }

    #[test]
    fn display_is_readable() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Variant::from(1));
        let v = Variant::from(vec![Variant::Null, Variant::from([1.0, 2.0]), Variant::from(map)]);
        assert_eq!(v.to_string(), "[null, (1, 2), {\"a\": 1}]");
    }

    #[test]
    fn json_in_and_out() {
        let v = Variant::from_json_value(&json!({"name": "Player", "hp": 3, "speed": 1.5, "tags": [true]}));
        let dict = v.as_dictionary().unwrap();
        assert_eq!(dict.get("name").and_then(Variant::as_str), Some("Player"));
        assert_eq!(dict.get("hp").and_then(Variant::as_i64), Some(3));
        assert_eq!(dict.get("speed").and_then(Variant::as_f64), Some(1.5));
        assert_eq!(
            dict.get("tags").and_then(Variant::as_array),
            Some(&[Variant::Bool(true)][..])
        );

        assert_eq!(Variant::from([1.0, 2.0]).to_json_value(), json!([1.0, 2.0]));
        assert_eq!(Variant::from(f64::NAN).to_json_value(), json!(null));
    }

    #[test]
    fn survives_bincode() {
        let mut map = BTreeMap::new();
        map.insert("speed".to_string(), Variant::from(4.25));
        map.insert("pos".to_string(), Variant::from([1.0, 2.0, 3.0]));
        let original = Variant::from(map);

        let bytes = bincode::serialize(&original).unwrap();
        let decoded: Variant = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, original);
    }
}
