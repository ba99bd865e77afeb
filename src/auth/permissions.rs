//! Registry of the permission tokens routes check for.
//!
//! Roles store permissions as plain strings so new tokens need no schema
//! change, but every role write is validated against [`ALL`] to catch typos.

pub const VIEW_USERS: &str = "view_users";
pub const CREATE_USER: &str = "create_user";
pub const EDIT_USER: &str = "edit_user";
pub const DELETE_USER: &str = "delete_user";
pub const MANAGE_ROLES: &str = "manage_roles";
pub const VIEW_CATEGORIES: &str = "view_categories";
pub const MANAGE_CATEGORIES: &str = "manage_categories";
pub const VIEW_CATALOGS: &str = "view_catalogs";
pub const MANAGE_CATALOGS: &str = "manage_catalogs";
pub const VIEW_PRODUCTS: &str = "view_products";
pub const CREATE_PRODUCT: &str = "create_product";
pub const EDIT_PRODUCT: &str = "edit_product";
pub const DELETE_PRODUCT: &str = "delete_product";
pub const MANAGE_STOCK: &str = "manage_stock";
pub const VIEW_BARCODES: &str = "view_barcodes";

pub const ALL: &[&str] = &[
    VIEW_USERS,
    CREATE_USER,
    EDIT_USER,
    DELETE_USER,
    MANAGE_ROLES,
    VIEW_CATEGORIES,
    MANAGE_CATEGORIES,
    VIEW_CATALOGS,
    MANAGE_CATALOGS,
    VIEW_PRODUCTS,
    CREATE_PRODUCT,
    EDIT_PRODUCT,
    DELETE_PRODUCT,
    MANAGE_STOCK,
    VIEW_BARCODES,
];

pub fn is_known(permission: &str) -> bool {
    ALL.contains(&permission)
}

/// Trim, drop empties and dedupe, keeping first-seen order.
/// Returns the unknown tokens as the error.
pub fn normalize(permissions: &[String]) -> Result<Vec<String>, Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(permissions.len());
    let mut unknown = Vec::new();

    for p in permissions.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        if !is_known(p) {
            unknown.push(p.to_string());
        } else if !out.iter().any(|seen| seen == p) {
            out.push(p.to_string());
        }
    }

    if unknown.is_empty() {
        Ok(out)
    } else {
        Err(unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_dedupes_and_trims() {
        let input = vec![
            " manage_stock".to_string(),
            "view_products".to_string(),
            "manage_stock".to_string(),
            "".to_string(),
        ];
        assert_eq!(
            normalize(&input).unwrap(),
            vec!["manage_stock".to_string(), "view_products".to_string()]
        );
    }

    #[test]
    fn normalize_reports_unknown_tokens() {
        let input = vec!["manage_stok".to_string(), "view_users".to_string()];
        assert_eq!(normalize(&input).unwrap_err(), vec!["manage_stok".to_string()]);
    }

    #[test]
    fn registry_has_no_duplicates() {
        for (i, p) in ALL.iter().enumerate() {
            assert!(!ALL[i + 1..].contains(p), "duplicate permission {p}");
        }
    }
}
