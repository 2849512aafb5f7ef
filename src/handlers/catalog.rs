use axum::extract::State;
use axum::response::Html;
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::{OptionExt, Result};
use crate::extractors::{Json, Path};
use crate::models::{Collection, Product};

/// Public view of a shared catalog: the collection, its products, and the
/// store it belongs to.
#[derive(Serialize)]
pub struct CatalogView {
    pub store_name: String,
    pub collection: Collection,
    pub products: Vec<Product>,
}

/// Resolve a share token into the catalog it names. No authentication -
/// possession of the token is the capability.
pub async fn get_catalog(
    State(state): State<AppState>,
    Path(share_token): Path<String>,
) -> Result<Json<CatalogView>> {
    let conn = state.db.get()?;

    let collection = queries::get_collection_by_share_token(&conn, &share_token)?
        .or_not_found("Catalog not found")?;
    let owner =
        queries::get_user_by_id(&conn, &collection.owner_id)?.or_not_found("Catalog not found")?;
    let products = queries::list_products_by_collection(&conn, &collection.id)?;

    Ok(Json(CatalogView {
        store_name: owner.store_name,
        collection,
        products,
    }))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Server-rendered Open Graph page for catalog links.
///
/// Messaging apps fetch this when a share link is pasted into a chat; real
/// browsers follow the meta refresh to the frontend.
pub async fn catalog_meta_page(
    State(state): State<AppState>,
    Path(share_token): Path<String>,
) -> Result<Html<String>> {
    let conn = state.db.get()?;

    let collection = queries::get_collection_by_share_token(&conn, &share_token)?
        .or_not_found("Catalog not found")?;
    let owner =
        queries::get_user_by_id(&conn, &collection.owner_id)?.or_not_found("Catalog not found")?;

    let title = escape_html(&format!("{} - {}", owner.store_name, collection.name));
    let description = escape_html(
        collection
            .description
            .as_deref()
            .unwrap_or("Check out our catalog"),
    );
    let target = format!("{}/catalog/{}", state.frontend_url, share_token);

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<meta property="og:title" content="{title}">
<meta property="og:description" content="{description}">
<meta property="og:type" content="website">
<meta property="og:url" content="{target}">
<meta http-equiv="refresh" content="0;url={target}">
</head>
<body>
<p>Redirecting to <a href="{target}">{title}</a>...</p>
</body>
</html>"#
    );

    Ok(Html(html))
}
