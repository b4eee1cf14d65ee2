//! Hit/miss partitioning of a multi-get result and the final merge.

use serde::de::DeserializeOwned;

/// A multi-get result split into what can be served and what must be fetched
#[derive(Debug)]
pub struct Partition<T> {
    /// Decoded cached items, in request order
    pub hits: Vec<T>,
    /// Identifiers still to fetch from the origin, in request order with duplicates
    pub remaining_ids: Vec<String>,
    /// Keys holding a value that did not decode, with the decode error
    pub corrupt: Vec<(String, String)>,
}

/// Split `values` (one slot per key) into hits and misses.
///
/// A slot is a hit when it holds a non-empty value that decodes as `T`. Empty slots and
/// undecodable values are misses.
pub fn partition<T: DeserializeOwned>(
    ids: &[String],
    keys: &[String],
    values: Vec<Option<String>>,
) -> Partition<T> {
    let mut partition = Partition {
        hits: Vec::with_capacity(values.len()),
        remaining_ids: Vec::new(),
        corrupt: Vec::new(),
    };

    for ((id, key), value) in ids.iter().zip(keys).zip(values) {
        match value.filter(|raw| !raw.is_empty()) {
            Some(raw) => match serde_json::from_str::<T>(&raw) {
                Ok(item) => partition.hits.push(item),
                Err(error) => {
                    partition.corrupt.push((key.clone(), error.to_string()));
                    partition.remaining_ids.push(id.clone());
                }
            },
            None => partition.remaining_ids.push(id.clone()),
        }
    }

    partition
}

/// Cached hits followed by freshly fetched items.
///
/// The result is not re-interleaved into request order.
pub fn merge<T>(mut hits: Vec<T>, fetched: Vec<T>) -> Vec<T> {
    hits.extend(fetched);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_partial_hit() {
        let ids = ids(&["1", "2", "3"]);
        let keys = crate::cache::keys::batch_keys("cuisine", &ids);
        let values = vec![
            Some(r#"{"id":1,"name":"thai"}"#.to_string()),
            None,
            Some(r#"{"id":3,"name":"greek"}"#.to_string()),
        ];

        let partition = partition::<Value>(&ids, &keys, values);
        assert_eq!(partition.remaining_ids, vec!["2"]);
        assert_eq!(
            partition.hits,
            vec![json!({"id": 1, "name": "thai"}), json!({"id": 3, "name": "greek"})]
        );
        assert!(partition.corrupt.is_empty());
    }

    #[test]
    fn test_empty_and_undecodable_values_are_misses() {
        let ids = ids(&["1", "2"]);
        let keys = crate::cache::keys::batch_keys("n", &ids);
        let values = vec![Some(String::new()), Some("not json".to_string())];

        let partition = partition::<u32>(&ids, &keys, values);
        assert!(partition.hits.is_empty());
        assert_eq!(partition.remaining_ids, vec!["1", "2"]);
        assert_eq!(partition.corrupt.len(), 1);
        assert_eq!(partition.corrupt[0].0, "n:2");
    }

    #[test]
    fn test_merge_appends_fetched_after_hits() {
        assert_eq!(merge(vec![1, 3], vec![2]), vec![1, 3, 2]);
        assert_eq!(merge(Vec::<u8>::new(), vec![]), Vec::<u8>::new());
    }

    proptest! {
        #[test]
        fn every_position_is_either_hit_or_miss(
            slots in proptest::collection::vec(proptest::option::of(0u32..1000), 0..50)
        ) {
            let ids: Vec<String> = (0..slots.len()).map(|i| i.to_string()).collect();
            let keys = crate::cache::keys::batch_keys("p", &ids);
            let values: Vec<Option<String>> =
                slots.iter().map(|slot| slot.map(|n| n.to_string())).collect();

            let partition = partition::<u32>(&ids, &keys, values);

            prop_assert_eq!(partition.hits.len() + partition.remaining_ids.len(), slots.len());
            let expected_hits: Vec<u32> = slots.iter().flatten().copied().collect();
            prop_assert_eq!(&partition.hits, &expected_hits);
            let expected_misses: Vec<String> = slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.is_none())
                .map(|(i, _)| i.to_string())
                .collect();
            prop_assert_eq!(&partition.remaining_ids, &expected_misses);
        }
    }
}
