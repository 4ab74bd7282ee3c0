use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{Catalog, Item, ItemLocation, load_catalog};
use crate::error::{AuditError, AuditResult};
use crate::presence::{FieldSlot, is_present};

pub const NO_DATA: &str = "no data";

const TRACKED_FIELD_COUNT: usize = 13;

/// Item attributes whose completeness is measured, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedField {
    InternalCode,
    Name,
    ManufacturerName,
    ManufactureCountry,
    ManufacturerItemDescription,
    UnitQty,
    Quantity,
    UnitOfMeasure,
    Weighted,
    QtyInPackage,
    Price,
    UnitOfMeasurePrice,
    AllowDiscount,
}

impl TrackedField {
    pub const ALL: [Self; TRACKED_FIELD_COUNT] = [
        Self::InternalCode,
        Self::Name,
        Self::ManufacturerName,
        Self::ManufactureCountry,
        Self::ManufacturerItemDescription,
        Self::UnitQty,
        Self::Quantity,
        Self::UnitOfMeasure,
        Self::Weighted,
        Self::QtyInPackage,
        Self::Price,
        Self::UnitOfMeasurePrice,
        Self::AllowDiscount,
    ];

    /// Key of the field in a catalog item.
    pub fn key(self) -> &'static str {
        match self {
            Self::InternalCode => "internal_code",
            Self::Name => "name",
            Self::ManufacturerName => "manufacturer_name",
            Self::ManufactureCountry => "manufacture_country",
            Self::ManufacturerItemDescription => "manufacturer_item_description",
            Self::UnitQty => "unit_qty",
            Self::Quantity => "quantity",
            Self::UnitOfMeasure => "unit_of_measure",
            Self::Weighted => "weighted",
            Self::QtyInPackage => "qty_in_package",
            Self::Price => "price",
            Self::UnitOfMeasurePrice => "unit_of_measure_price",
            Self::AllowDiscount => "allow_discount",
        }
    }

    /// Name printed in the report.
    pub fn label(self) -> &'static str {
        match self {
            Self::InternalCode => "is_internal",
            Self::Name => "has_name",
            Self::ManufacturerName => "has_manufacturer_name",
            Self::ManufactureCountry => "has_manufacture_country",
            Self::ManufacturerItemDescription => "has_manufacturer_item_description",
            Self::UnitQty => "has_unit_qty",
            Self::Quantity => "has_quantity",
            Self::UnitOfMeasure => "has_unit_of_measure",
            Self::Weighted => "is_weighted",
            Self::QtyInPackage => "has_qty_in_package",
            Self::Price => "has_price",
            Self::UnitOfMeasurePrice => "has_unit_of_measure_price",
            Self::AllowDiscount => "has_allow_discount",
        }
    }

    pub fn slot(self, item: &Item) -> &FieldSlot {
        match self {
            Self::InternalCode => &item.internal_code,
            Self::Name => &item.name,
            Self::ManufacturerName => &item.manufacturer_name,
            Self::ManufactureCountry => &item.manufacture_country,
            Self::ManufacturerItemDescription => &item.manufacturer_item_description,
            Self::UnitQty => &item.unit_qty,
            Self::Quantity => &item.quantity,
            Self::UnitOfMeasure => &item.unit_of_measure,
            Self::Weighted => &item.weighted,
            Self::QtyInPackage => &item.qty_in_package,
            Self::Price => &item.price,
            Self::UnitOfMeasurePrice => &item.unit_of_measure_price,
            Self::AllowDiscount => &item.allow_discount,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// What to do with an item that lacks a tracked key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFieldPolicy {
    /// Abort the audit with [`AuditError::MissingField`].
    #[default]
    Error,
    /// Count the key as absent.
    Absent,
}

impl MissingFieldPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Absent => "absent",
        }
    }
}

/// Counters accumulated over one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub total: usize,
    counts: [usize; TRACKED_FIELD_COUNT],
}

impl Tally {
    pub fn count(&self, field: TrackedField) -> usize {
        self.counts[field.index()]
    }

    /// Fold one item into the tally.
    pub fn record(
        self,
        location: ItemLocation,
        item: &Item,
        policy: MissingFieldPolicy,
    ) -> AuditResult<Self> {
        let mut counts = self.counts;
        for field in TrackedField::ALL {
            let present = match (field.slot(item).value(), policy) {
                (Some(value), _) => is_present(value),
                (None, MissingFieldPolicy::Absent) => false,
                (None, MissingFieldPolicy::Error) => {
                    return Err(AuditError::MissingField {
                        field: field.key(),
                        store_index: location.store_index,
                        item_index: location.item_index,
                    });
                }
            };
            if present {
                counts[field.index()] += 1;
            }
        }
        Ok(Self {
            total: self.total + 1,
            counts,
        })
    }

    pub fn into_report(self, stores: usize) -> CompletenessReport {
        let fields = TrackedField::ALL
            .into_iter()
            .map(|field| {
                let count = self.count(field);
                FieldCompleteness {
                    field: field.key(),
                    label: field.label(),
                    count,
                    percentage: percentage(count, self.total),
                }
            })
            .collect();
        CompletenessReport {
            stores,
            total_items: self.total,
            fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCompleteness {
    pub field: &'static str,
    pub label: &'static str,
    pub count: usize,
    /// `None` when the catalog had no items.
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletenessReport {
    pub stores: usize,
    pub total_items: usize,
    pub fields: Vec<FieldCompleteness>,
}

impl CompletenessReport {
    pub fn has_data(&self) -> bool {
        self.total_items > 0
    }

    pub fn field(&self, field: TrackedField) -> Option<&FieldCompleteness> {
        self.fields.iter().find(|entry| entry.field == field.key())
    }
}

/// Count present values for every tracked field. Fails without a partial
/// report if an item lacks a key under [`MissingFieldPolicy::Error`].
pub fn audit_catalog(
    catalog: &Catalog,
    policy: MissingFieldPolicy,
) -> AuditResult<CompletenessReport> {
    let tally = catalog
        .items()
        .try_fold(Tally::default(), |tally, (location, item)| {
            tally.record(location, item, policy)
        })?;
    Ok(tally.into_report(catalog.stores.len()))
}

pub fn audit_file(path: &Path, policy: MissingFieldPolicy) -> AuditResult<CompletenessReport> {
    let catalog = load_catalog(path)?;
    let report = audit_catalog(&catalog, policy)?;
    info!(
        path = %path.display(),
        stores = report.stores,
        items = report.total_items,
        policy = policy.as_str(),
        "field completeness audit finished"
    );
    Ok(report)
}

/// One `<label> : <count>(<percentage>%)` line per tracked field.
pub fn render_report_lines(report: &CompletenessReport) -> Vec<String> {
    report
        .fields
        .iter()
        .map(|entry| match entry.percentage {
            Some(percentage) => format!(
                "{} : {}({}%)",
                entry.label,
                entry.count,
                format_percentage(percentage)
            ),
            None => format!("{} : {}({NO_DATA})", entry.label, entry.count),
        })
        .collect()
}

fn percentage(count: usize, total: usize) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some((100 * count) as f64 / total as f64)
}

/// Shortest round-trip rendering, always with a fractional part or an
/// exponent: `100.0`, `33.333333333333336`, `1e-05`.
pub fn format_percentage(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0.0".to_string();
    }

    let scientific = format!("{value:e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let decimal_point = exponent + 1;
    if decimal_point <= -4 || decimal_point > 16 {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exponent.abs());
    }

    let fixed = value.to_string();
    if fixed.contains('.') {
        fixed
    } else {
        format!("{fixed}.0")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use serde_json::json;
    use tempfile::tempdir;

    use super::{
        MissingFieldPolicy, NO_DATA, TrackedField, audit_catalog, audit_file, format_percentage,
        render_report_lines,
    };
    use crate::catalog::{Catalog, parse_catalog};
    use crate::error::AuditError;
    use crate::presence::is_present;

    fn catalog(value: serde_json::Value) -> Catalog {
        parse_catalog(&value.to_string(), Path::new("prices.json")).expect("parse catalog")
    }

    fn full_item() -> serde_json::Value {
        json!({
            "internal_code": "7290000000001",
            "name": "Milk 3%",
            "manufacturer_name": "Tnuva",
            "manufacture_country": "IL",
            "manufacturer_item_description": "Milk carton",
            "unit_qty": "liter",
            "quantity": 1,
            "unit_of_measure": "l",
            "weighted": true,
            "qty_in_package": 1,
            "price": 6.9,
            "unit_of_measure_price": 6.9,
            "allow_discount": true
        })
    }

    fn line<'a>(lines: &'a [String], label: &str) -> &'a str {
        lines
            .iter()
            .find(|line| line.starts_with(&format!("{label} : ")))
            .map(String::as_str)
            .unwrap_or_else(|| panic!("missing line for {label}"))
    }

    #[test]
    fn single_item_scenario_matches_expected_counts() {
        let catalog = catalog(json!([{"items": [{
            "internal_code": "1",
            "name": "A",
            "manufacturer_name": "",
            "manufacture_country": null,
            "manufacturer_item_description": "d",
            "unit_qty": "1kg",
            "quantity": 0,
            "unit_of_measure": "kg",
            "weighted": false,
            "qty_in_package": 1,
            "price": 10.5,
            "unit_of_measure_price": 10.5,
            "allow_discount": true
        }]}]));

        let report = audit_catalog(&catalog, MissingFieldPolicy::Error).expect("audit");
        assert_eq!(report.total_items, 1);

        let lines = render_report_lines(&report);
        assert_eq!(line(&lines, "has_name"), "has_name : 1(100.0%)");
        assert_eq!(
            line(&lines, "has_manufacturer_name"),
            "has_manufacturer_name : 0(0.0%)"
        );
        assert_eq!(
            line(&lines, "has_manufacture_country"),
            "has_manufacture_country : 0(0.0%)"
        );
        assert_eq!(line(&lines, "has_quantity"), "has_quantity : 0(0.0%)");
        assert_eq!(line(&lines, "has_price"), "has_price : 1(100.0%)");
        assert_eq!(line(&lines, "is_weighted"), "is_weighted : 0(0.0%)");
        assert_eq!(
            line(&lines, "has_allow_discount"),
            "has_allow_discount : 1(100.0%)"
        );
        assert_eq!(line(&lines, "is_internal"), "is_internal : 1(100.0%)");
    }

    #[test]
    fn two_full_stores_report_everything_present() {
        let catalog = catalog(json!([{"items": [full_item()]}, {"items": [full_item()]}]));
        let report = audit_catalog(&catalog, MissingFieldPolicy::Error).expect("audit");

        assert_eq!(report.stores, 2);
        assert_eq!(report.total_items, 2);
        for entry in &report.fields {
            assert_eq!(entry.count, 2, "{}", entry.field);
            assert_eq!(entry.percentage, Some(100.0), "{}", entry.field);
        }
    }

    #[test]
    fn lines_follow_item_field_order() {
        let catalog = catalog(json!([{"items": [full_item()]}]));
        let report = audit_catalog(&catalog, MissingFieldPolicy::Error).expect("audit");
        let labels = render_report_lines(&report)
            .iter()
            .map(|line| line.split(" : ").next().unwrap_or_default().to_string())
            .collect::<Vec<_>>();
        let expected = TrackedField::ALL
            .iter()
            .map(|field| field.label().to_string())
            .collect::<Vec<_>>();
        assert_eq!(labels, expected);
        assert_eq!(labels.first().map(String::as_str), Some("is_internal"));
        assert_eq!(labels.last().map(String::as_str), Some("has_allow_discount"));
    }

    #[test]
    fn zero_quantity_and_price_are_counted_as_absent() {
        let mut item = full_item();
        item["quantity"] = json!(0);
        item["price"] = json!(0.0);
        let catalog = catalog(json!([{"items": [item, full_item()]}]));

        let report = audit_catalog(&catalog, MissingFieldPolicy::Error).expect("audit");
        let quantity = report.field(TrackedField::Quantity).expect("quantity");
        let price = report.field(TrackedField::Price).expect("price");
        assert_eq!(quantity.count, 1);
        assert_eq!(quantity.percentage, Some(50.0));
        assert_eq!(price.count, 1);
    }

    #[test]
    fn empty_catalogs_report_no_data() {
        for raw in [json!([]), json!([{"items": []}, {"items": []}])] {
            let report = audit_catalog(&catalog(raw), MissingFieldPolicy::Error).expect("audit");
            assert!(!report.has_data());
            assert_eq!(report.fields.len(), TrackedField::ALL.len());
            for entry in &report.fields {
                assert_eq!(entry.count, 0);
                assert_eq!(entry.percentage, None);
            }
            let lines = render_report_lines(&report);
            assert_eq!(lines[1], format!("has_name : 0({NO_DATA})"));
        }
    }

    #[test]
    fn json_report_carries_counts_and_percentages() {
        let mut item = full_item();
        item["price"] = json!(0);
        let catalog = catalog(json!([{"items": [item, full_item()]}]));
        let report = audit_catalog(&catalog, MissingFieldPolicy::Error).expect("audit");

        let value = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(value["stores"], json!(1));
        assert_eq!(value["total_items"], json!(2));
        let fields = value["fields"].as_array().expect("fields array");
        assert_eq!(fields.len(), TrackedField::ALL.len());
        assert_eq!(
            fields[0],
            json!({"field": "internal_code", "label": "is_internal", "count": 2, "percentage": 100.0})
        );
        let price = fields
            .iter()
            .find(|entry| entry["field"] == "price")
            .expect("price entry");
        assert_eq!(
            *price,
            json!({"field": "price", "label": "has_price", "count": 1, "percentage": 50.0})
        );
    }

    #[test]
    fn json_report_for_empty_catalog_has_null_percentages() {
        let report = audit_catalog(&catalog(json!([])), MissingFieldPolicy::Error).expect("audit");

        let value = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(value["stores"], json!(0));
        assert_eq!(value["total_items"], json!(0));
        let fields = value["fields"].as_array().expect("fields array");
        assert_eq!(fields.len(), TrackedField::ALL.len());
        for entry in fields {
            assert_eq!(entry["count"], json!(0));
            assert!(entry["percentage"].is_null(), "{entry}");
            assert!(entry.as_object().expect("object").contains_key("percentage"));
        }
    }

    #[test]
    fn missing_key_fails_with_location() {
        let mut item = full_item();
        item.as_object_mut().expect("object").remove("unit_qty");
        let catalog = catalog(json!([{"items": [full_item()]}, {"items": [full_item(), item]}]));

        let error = audit_catalog(&catalog, MissingFieldPolicy::Error).expect_err("must fail");
        match error {
            AuditError::MissingField {
                field,
                store_index,
                item_index,
            } => {
                assert_eq!(field, "unit_qty");
                assert_eq!(store_index, 1);
                assert_eq!(item_index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_key_counts_as_absent_when_allowed() {
        let catalog = catalog(json!([{"items": [{"name": "Only a name"}, full_item()]}]));
        let report = audit_catalog(&catalog, MissingFieldPolicy::Absent).expect("audit");
        assert_eq!(report.total_items, 2);
        assert_eq!(report.field(TrackedField::Name).expect("name").count, 2);
        assert_eq!(report.field(TrackedField::Price).expect("price").count, 1);
    }

    #[test]
    fn counts_match_per_item_checks_and_stay_in_bounds() {
        let catalog = catalog(json!([
            {"items": [full_item(), {
                "internal_code": "", "name": "x", "manufacturer_name": null,
                "manufacture_country": "", "manufacturer_item_description": "",
                "unit_qty": "", "quantity": "0", "unit_of_measure": "",
                "weighted": 0, "qty_in_package": "", "price": "", "unit_of_measure_price": 0,
                "allow_discount": false
            }]},
            {"items": []},
            {"items": [full_item()]}
        ]));
        let report = audit_catalog(&catalog, MissingFieldPolicy::Error).expect("audit");

        for field in TrackedField::ALL {
            let expected = catalog
                .items()
                .filter(|(_, item)| field.slot(item).value().is_some_and(is_present))
                .count();
            let entry = report.field(field).expect("field entry");
            assert_eq!(entry.count, expected, "{}", field.key());
            assert!(entry.count <= report.total_items);
        }
        // "0" is a non-empty string.
        assert_eq!(report.field(TrackedField::Quantity).expect("quantity").count, 3);
        assert_eq!(report.field(TrackedField::Weighted).expect("weighted").count, 2);
    }

    #[test]
    fn auditing_twice_is_idempotent() {
        let catalog = catalog(json!([{"items": [full_item(), {
            "internal_code": "", "name": "", "manufacturer_name": "", "manufacture_country": "",
            "manufacturer_item_description": "", "unit_qty": "", "quantity": 0,
            "unit_of_measure": "", "weighted": false, "qty_in_package": 0, "price": 0,
            "unit_of_measure_price": 0, "allow_discount": false
        }, full_item()]}]));
        let first = audit_catalog(&catalog, MissingFieldPolicy::Error).expect("first audit");
        let second = audit_catalog(&catalog, MissingFieldPolicy::Error).expect("second audit");
        assert_eq!(first, second);
        assert_eq!(
            render_report_lines(&first)[1],
            "has_name : 2(66.66666666666667%)"
        );
    }

    #[test]
    fn audit_file_reads_catalog_from_disk() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("prices.json");
        fs::write(&path, json!([{"items": [full_item()]}]).to_string()).expect("write catalog");
        let report = audit_file(&path, MissingFieldPolicy::Error).expect("audit file");
        assert_eq!(report.total_items, 1);
    }

    #[test]
    fn percentages_render_like_shortest_float_repr() {
        assert_eq!(format_percentage(100.0), "100.0");
        assert_eq!(format_percentage(0.0), "0.0");
        assert_eq!(format_percentage(50.0), "50.0");
        assert_eq!(format_percentage(100.0 / 3.0), "33.333333333333336");
        assert_eq!(format_percentage(12.5), "12.5");
        assert_eq!(format_percentage(0.001), "0.001");
        assert_eq!(format_percentage(0.0001), "0.0001");
        assert_eq!(format_percentage(0.00001), "1e-05");
        assert_eq!(format_percentage(0.000025), "2.5e-05");
    }
}
