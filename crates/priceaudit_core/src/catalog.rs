use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{AuditError, AuditResult};
use crate::presence::FieldSlot;

/// One priced item. Only the tracked keys are kept; anything else in the
/// source object is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Item {
    pub internal_code: FieldSlot,
    pub name: FieldSlot,
    pub manufacturer_name: FieldSlot,
    pub manufacture_country: FieldSlot,
    pub manufacturer_item_description: FieldSlot,
    pub unit_qty: FieldSlot,
    pub quantity: FieldSlot,
    pub unit_of_measure: FieldSlot,
    pub weighted: FieldSlot,
    pub qty_in_package: FieldSlot,
    pub price: FieldSlot,
    pub unit_of_measure_price: FieldSlot,
    pub allow_discount: FieldSlot,
}

#[derive(Debug, Clone, Default)]
pub struct Store {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub stores: Vec<Store>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLocation {
    pub store_index: usize,
    pub item_index: usize,
}

#[derive(Debug, Deserialize)]
struct RawStore {
    #[serde(default)]
    items: Option<Vec<Item>>,
}

impl Catalog {
    pub fn item_count(&self) -> usize {
        self.stores.iter().map(|store| store.items.len()).sum()
    }

    /// Items in store order, then in item order within each store.
    pub fn items(&self) -> impl Iterator<Item = (ItemLocation, &Item)> {
        self.stores
            .iter()
            .enumerate()
            .flat_map(|(store_index, store)| {
                store
                    .items
                    .iter()
                    .enumerate()
                    .map(move |(item_index, item)| {
                        (
                            ItemLocation {
                                store_index,
                                item_index,
                            },
                            item,
                        )
                    })
            })
    }
}

/// Read and parse a whole catalog file into memory.
pub fn load_catalog(path: &Path) -> AuditResult<Catalog> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            AuditError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            AuditError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let catalog = parse_catalog(&content, path)?;
    debug!(
        path = %path.display(),
        stores = catalog.stores.len(),
        items = catalog.item_count(),
        "loaded catalog"
    );
    Ok(catalog)
}

/// Parse catalog JSON. `origin` is only used in error messages.
pub fn parse_catalog(content: &str, origin: &Path) -> AuditResult<Catalog> {
    let raw: Vec<RawStore> =
        serde_json::from_str(content).map_err(|error| AuditError::MalformedData {
            path: origin.to_path_buf(),
            reason: error.to_string(),
        })?;

    let mut stores = Vec::with_capacity(raw.len());
    for (store_index, store) in raw.into_iter().enumerate() {
        let Some(items) = store.items else {
            return Err(AuditError::MalformedData {
                path: origin.to_path_buf(),
                reason: format!("store {store_index} has no `items` list"),
            });
        };
        stores.push(Store { items });
    }
    Ok(Catalog { stores })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::tempdir;

    use super::{ItemLocation, load_catalog, parse_catalog};
    use crate::error::AuditError;
    use crate::presence::{FieldSlot, FieldValue};

    #[test]
    fn parse_catalog_keeps_null_and_missing_apart() {
        let catalog = parse_catalog(
            r#"[{"store_id": 7, "items": [{"name": "Milk", "manufacture_country": null, "extra": 1}]}]"#,
            Path::new("prices.json"),
        )
        .expect("parse catalog");

        assert_eq!(catalog.stores.len(), 1);
        let item = &catalog.stores[0].items[0];
        assert_eq!(item.name, FieldSlot::Present(FieldValue::Text("Milk".to_string())));
        assert_eq!(item.manufacture_country, FieldSlot::Present(FieldValue::Null));
        assert_eq!(item.price, FieldSlot::Missing);
    }

    #[test]
    fn parse_catalog_rejects_store_without_items() {
        let error = parse_catalog(r#"[{"items": []}, {"store_id": 2}]"#, Path::new("prices.json"))
            .expect_err("must fail");
        match error {
            AuditError::MalformedData { reason, .. } => {
                assert!(reason.contains("store 1"), "reason: {reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_catalog_rejects_non_array_top_level() {
        let error =
            parse_catalog(r#"{"items": []}"#, Path::new("prices.json")).expect_err("must fail");
        assert!(matches!(error, AuditError::MalformedData { .. }));
    }

    #[test]
    fn parse_catalog_rejects_duplicate_item_keys() {
        let error = parse_catalog(
            r#"[{"items": [{"name": "Milk", "name": "Bread"}]}]"#,
            Path::new("prices.json"),
        )
        .expect_err("must fail");
        match error {
            AuditError::MalformedData { reason, .. } => {
                assert!(reason.contains("duplicate field `name`"), "reason: {reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn items_are_located_by_store_and_position() {
        let catalog = parse_catalog(
            r#"[{"items": [{}, {}]}, {"items": []}, {"items": [{}]}]"#,
            Path::new("prices.json"),
        )
        .expect("parse catalog");
        let locations = catalog
            .items()
            .map(|(location, _)| location)
            .collect::<Vec<_>>();
        assert_eq!(
            locations,
            vec![
                ItemLocation {
                    store_index: 0,
                    item_index: 0
                },
                ItemLocation {
                    store_index: 0,
                    item_index: 1
                },
                ItemLocation {
                    store_index: 2,
                    item_index: 0
                },
            ]
        );
        assert_eq!(catalog.item_count(), 3);
    }

    #[test]
    fn load_catalog_reports_missing_file() {
        let temp = tempdir().expect("tempdir");
        let error = load_catalog(&temp.path().join("prices.json")).expect_err("must fail");
        assert!(matches!(error, AuditError::FileNotFound { .. }));
        assert!(error.to_string().contains("catalog file not found"));
    }

    #[test]
    fn load_catalog_reads_file_from_disk() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("prices.json");
        fs::write(&path, r#"[{"items": [{"name": "Bread"}]}]"#).expect("write catalog");
        let catalog = load_catalog(&path).expect("load catalog");
        assert_eq!(catalog.item_count(), 1);
    }
}
