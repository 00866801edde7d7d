//! Turning configuration into flattening options
//!
//! Configured ids are checked against the data source: unknown suppliers and
//! categories are dropped with a warning rather than failing the run.

use std::collections::BTreeSet;

use crate::bom::categorize::{CategoryMappings, MappingKind};
use crate::bom::FlattenOptions;
use crate::core::config::Config;
use crate::core::identity::SupplierId;
use crate::core::store::{BomSource, StoreError};

/// Build the full option set from configuration
pub fn resolve<S: BomSource + ?Sized>(
    config: &Config,
    source: &S,
) -> Result<FlattenOptions, StoreError> {
    Ok(FlattenOptions {
        max_depth: config.max_depth,
        expand_purchased_assemblies: config.expand_purchased_assemblies(),
        internal_suppliers: internal_supplier_ids(config, source)?,
        category_mappings: category_mappings(config, source)?,
        enable_internal_fab_cuts: config.enable_internal_fab_cuts(),
        internal_fab_units: parse_units(config.internal_fab_cut_units()),
    })
}

/// Primary plus additional internal suppliers that exist in the data source
pub fn internal_supplier_ids<S: BomSource + ?Sized>(
    config: &Config,
    source: &S,
) -> Result<BTreeSet<SupplierId>, StoreError> {
    let mut candidates: BTreeSet<SupplierId> = config.primary_internal_supplier.into_iter().collect();

    if let Some(additional) = &config.additional_internal_suppliers {
        for entry in additional.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match entry.parse::<SupplierId>() {
                Ok(id) => {
                    candidates.insert(id);
                }
                Err(e) => tracing::warn!(entry, error = %e, "ignoring additional_internal_suppliers entry"),
            }
        }
    }

    let mut valid = BTreeSet::new();
    for id in candidates {
        if source.supplier_exists(id)? {
            valid.insert(id);
        } else {
            tracing::warn!(supplier = %id, "internal supplier does not exist; ignoring");
        }
    }
    Ok(valid)
}

/// Configured categories expanded to include their descendants
pub fn category_mappings<S: BomSource + ?Sized>(
    config: &Config,
    source: &S,
) -> Result<CategoryMappings, StoreError> {
    let mut mappings = CategoryMappings::new();

    for kind in MappingKind::all() {
        let Some(id) = config.category_setting(kind.key()) else {
            continue;
        };
        match source.category_descendants(id)? {
            Some(ids) => {
                tracing::debug!(group = kind.key(), category = %id, count = ids.len(), "category mapping");
                mappings.insert(*kind, ids);
            }
            None => tracing::warn!(
                group = kind.key(),
                category = %id,
                "configured category does not exist; ignoring"
            ),
        }
    }

    Ok(mappings)
}

/// Split a comma-separated unit list into trimmed lower-case tokens
pub fn parse_units(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(|u| u.trim().to_lowercase())
        .filter(|u| !u.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::CategoryId;
    use crate::core::store::PartStore;
    use crate::entities::{Category, Supplier};

    fn store() -> PartStore {
        PartStore::new()
            .with_supplier(Supplier::new(1, "Shop"))
            .with_supplier(Supplier::new(7, "Weld bay"))
            .with_category(Category::new(5, "Fabrication", None))
            .with_category(Category::new(12, "Sheet metal", Some(5)))
            .with_category(Category::new(13, "Laser", Some(12)))
            .with_category(Category::new(8, "Commercial", None))
    }

    #[test]
    fn test_internal_suppliers_dedup_and_validate() {
        let config = Config {
            primary_internal_supplier: Some(SupplierId(1)),
            additional_internal_suppliers: Some("7, 1, abc, 0, 99,".to_string()),
            ..Default::default()
        };
        let ids = internal_supplier_ids(&config, &store()).unwrap();
        assert_eq!(ids, BTreeSet::from([SupplierId(1), SupplierId(7)]));
    }

    #[test]
    fn test_category_mappings_include_descendants() {
        let config = Config {
            fabrication_category: Some(CategoryId(5)),
            commercial_category: Some(CategoryId(8)),
            cut_to_length_category: Some(CategoryId(404)),
            ..Default::default()
        };
        let mappings = category_mappings(&config, &store()).unwrap();

        assert_eq!(
            mappings.ids(MappingKind::Fabrication),
            vec![CategoryId(5), CategoryId(12), CategoryId(13)]
        );
        assert_eq!(mappings.ids(MappingKind::Commercial), vec![CategoryId(8)]);
        assert!(mappings.ids(MappingKind::CutToLength).is_empty());
    }

    #[test]
    fn test_unconfigured_mappings_are_empty() {
        let mappings = category_mappings(&Config::default(), &store()).unwrap();
        assert!(mappings.is_empty());
    }

    #[test]
    fn test_parse_units() {
        let units = parse_units(" MM, in ,,Ft");
        assert_eq!(
            units,
            BTreeSet::from(["ft".to_string(), "in".to_string(), "mm".to_string()])
        );
    }

    #[test]
    fn test_resolve_defaults() {
        let options = resolve(&Config::default(), &store()).unwrap();
        assert_eq!(options.max_depth, None);
        assert!(!options.expand_purchased_assemblies);
        assert!(!options.enable_internal_fab_cuts);
        assert!(options.internal_suppliers.is_empty());
        assert_eq!(options.internal_fab_units.len(), 4);
    }
}
