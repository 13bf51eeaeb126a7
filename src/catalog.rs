//! The fixed catalog this tool provisions.

use anyhow::Context;
use provision_kernel::{
    Catalog, CollectionSpec, DatabaseSpec, Direction, IndexSpec, PrincipalSpec,
};

use crate::seed::{self, SeedSet};

pub const BASEMAP: &str = "BaseMap";
pub const TERRAIN: &str = "Terrain";
pub const TEST: &str = "test";

/// Placeholder collection that makes an otherwise empty database visible.
const INIT_COLLECTION: &str = "init";

/// Build the catalog: `BaseMap`, `Terrain` and the seeded `test` database.
pub fn fixed() -> anyhow::Result<Catalog> {
    let seed = SeedSet::load()?;
    let catalog = Catalog::new(vec![
        DatabaseSpec::new(
            BASEMAP,
            PrincipalSpec::read_write("basemap_user", "basemap_password"),
        )
        .with_collection(CollectionSpec::explicit(INIT_COLLECTION)),
        DatabaseSpec::new(
            TERRAIN,
            PrincipalSpec::read_write("terrain_user", "terrain_password"),
        )
        .with_collection(CollectionSpec::explicit(INIT_COLLECTION)),
        test_database(&seed)?,
    ]);
    catalog.validate().context("fixed catalog is inconsistent")?;
    Ok(catalog)
}

fn test_database(seed: &SeedSet) -> anyhow::Result<DatabaseSpec> {
    let users = CollectionSpec::implicit("users")
        .with_seed(seed::to_documents(&seed.users)?)
        .with_index(IndexSpec::ascending("username").unique())
        .with_index(IndexSpec::ascending("email").unique())
        .with_index(IndexSpec::ascending("city"))
        .with_index(IndexSpec::descending("createdAt"));

    let products = CollectionSpec::implicit("products")
        .with_seed(seed::to_documents(&seed.products)?)
        .with_index(IndexSpec::ascending("name"))
        .with_index(IndexSpec::ascending("price"))
        .with_index(IndexSpec::ascending("tags"))
        .with_index(IndexSpec::ascending("category").then("price", Direction::Descending))
        .with_index(IndexSpec::descending("createdAt"));

    let orders = CollectionSpec::implicit("orders")
        .with_seed(seed::to_documents(&seed.orders)?)
        .with_index(IndexSpec::ascending("orderNumber").unique())
        .with_index(IndexSpec::ascending("userId"))
        .with_index(IndexSpec::ascending("status"))
        .with_index(IndexSpec::descending("orderDate"));

    let categories = CollectionSpec::implicit("categories")
        .with_seed(seed::to_documents(&seed.categories)?)
        .with_index(IndexSpec::ascending("name").unique())
        .with_index(IndexSpec::ascending("parentCategory"));

    Ok(
        DatabaseSpec::new(TEST, PrincipalSpec::read_write("test_user", "test_password"))
            .with_collection(users)
            .with_collection(products)
            .with_collection(orders)
            .with_collection(categories),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_kernel::Creation;

    #[test]
    fn fixed_catalog_declares_three_databases() {
        let catalog = fixed().unwrap();
        let names: Vec<_> = catalog.databases.iter().map(|db| db.name.as_str()).collect();
        assert_eq!(names, vec![BASEMAP, TERRAIN, TEST]);
    }

    #[test]
    fn placeholder_databases_are_explicit() {
        let catalog = fixed().unwrap();
        for name in [BASEMAP, TERRAIN] {
            let db = catalog.database(name).unwrap();
            assert_eq!(db.collections.len(), 1);
            assert_eq!(db.collections[0].creation, Creation::Explicit);
            assert!(db.collections[0].seed.is_empty());
        }
    }

    #[test]
    fn test_database_index_layout() {
        let catalog = fixed().unwrap();
        let test = catalog.database(TEST).unwrap();
        let per_collection: Vec<_> = test
            .collections
            .iter()
            .map(|c| (c.name.as_str(), c.indexes.len(), c.seed.len()))
            .collect();
        assert_eq!(
            per_collection,
            vec![
                ("users", 4, 5),
                ("products", 5, 5),
                ("orders", 4, 3),
                ("categories", 2, 4),
            ]
        );
        assert_eq!(catalog.index_count(), 15);
        assert_eq!(catalog.seed_count(), 17);
    }

    #[test]
    fn unique_indexes_cover_natural_keys() {
        let catalog = fixed().unwrap();
        let unique: Vec<_> = catalog
            .collections()
            .flat_map(|(_, c)| c.indexes.iter().filter(|i| i.unique).map(IndexSpec::name))
            .collect();
        assert_eq!(
            unique,
            vec!["username_1", "email_1", "orderNumber_1", "name_1"]
        );
    }

    #[test]
    fn every_database_has_a_scoped_principal() {
        let catalog = fixed().unwrap();
        let principals: Vec<_> = catalog
            .databases
            .iter()
            .map(|db| db.principal.name.as_str())
            .collect();
        assert_eq!(principals, vec!["basemap_user", "terrain_user", "test_user"]);
    }
}
