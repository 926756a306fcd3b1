use std::collections::HashMap;

/// The `hotwords` control field is a JSON-encoded string whose inner
/// content is either an FST weight map or free-text NN hotwords. Which one
/// it is gets decided by trial parse, not by a wrapper tag the client sends.
#[derive(Debug, Clone, PartialEq)]
pub enum HotwordsSpec {
    FstMap(HashMap<String, i64>),
    FreeText(String),
}

impl HotwordsSpec {
    /// "Is this a JSON object" and "do its values convert to weights" are
    /// two separate checks. A payload that fails to parse as JSON at all,
    /// or parses to something other than an object, is free text. A payload
    /// that parses as an object but has a value that isn't an integer is
    /// still treated as the client's FST map — just an empty one, since one
    /// bad value aborts the whole conversion rather than silently retyping
    /// the payload as free text.
    pub fn resolve(raw: &str) -> HotwordsSpec {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
            return HotwordsSpec::FreeText(raw.to_string());
        };
        let Some(obj) = value.as_object() else {
            return HotwordsSpec::FreeText(raw.to_string());
        };

        let mut fst = HashMap::new();
        for (key, val) in obj {
            match val.as_i64() {
                Some(weight) => {
                    fst.insert(key.clone(), weight);
                }
                None => return HotwordsSpec::FstMap(HashMap::new()),
            }
        }
        HotwordsSpec::FstMap(fst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_parses_as_fst_map() {
        let spec = HotwordsSpec::resolve(r#"{"阿里巴巴":20}"#);
        match spec {
            HotwordsSpec::FstMap(map) => assert_eq!(map.get("阿里巴巴"), Some(&20)),
            HotwordsSpec::FreeText(_) => panic!("expected FstMap"),
        }
    }

    #[test]
    fn zero_weight_is_accepted() {
        let spec = HotwordsSpec::resolve(r#"{"foo":0}"#);
        match spec {
            HotwordsSpec::FstMap(map) => assert_eq!(map.get("foo"), Some(&0)),
            HotwordsSpec::FreeText(_) => panic!("expected FstMap"),
        }
    }

    #[test]
    fn non_object_falls_back_to_free_text() {
        let spec = HotwordsSpec::resolve("阿里巴巴 腾讯");
        assert_eq!(spec, HotwordsSpec::FreeText("阿里巴巴 腾讯".to_string()));
    }

    #[test]
    fn array_is_not_a_map_and_falls_back_to_free_text() {
        let spec = HotwordsSpec::resolve("[1,2,3]");
        assert!(matches!(spec, HotwordsSpec::FreeText(_)));
    }

    #[test]
    fn object_with_non_integer_value_stays_an_fst_map_but_is_emptied() {
        let spec = HotwordsSpec::resolve(r#"{"foo":"bar"}"#);
        assert_eq!(spec, HotwordsSpec::FstMap(HashMap::new()));
    }
}
