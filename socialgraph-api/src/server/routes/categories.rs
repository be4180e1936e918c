use crate::server::{Result, ServerError, ServerRouter, json::Json, params, query::Query};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use socialgraph_common::{
    model::{
        Id,
        category::{Category, CategoryMarker, CreateCategory},
    },
    util::lenient_string,
};
use socialgraph_db::store::Store;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_categories)
        .typed_get(get_category)
        .typed_post(add_category)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/categories", rejection(ServerError))]
struct CategoriesPath();

async fn get_categories(
    CategoriesPath(): CategoriesPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Vec<Category>>> {
    let categories = store.list_categories().await?;

    Ok(Json(categories))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/category", rejection(ServerError))]
struct CategoryPath();

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryQuery {
    #[serde(default)]
    category_id: String,
}

async fn get_category(
    CategoryPath(): CategoryPath,
    State(store): State<Arc<dyn Store>>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Category>> {
    let id = params::require_id("categoryId", &query.category_id)?;
    let category = store
        .fetch_category(id)
        .await?
        .ok_or(ServerError::CategoryByIdNotFound(id))?;

    Ok(Json(category))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/addCategory", rejection(ServerError))]
struct AddCategoryPath();

#[derive(Deserialize)]
struct AddCategoryBody {
    #[serde(default, deserialize_with = "lenient_string")]
    name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    description: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryCreated {
    message: &'static str,
    category_id: Id<CategoryMarker>,
}

async fn add_category(
    AddCategoryPath(): AddCategoryPath,
    State(store): State<Arc<dyn Store>>,
    Json(body): Json<AddCategoryBody>,
) -> Result<Json<CategoryCreated>> {
    params::require("name", &body.name)?;
    params::require("description", &body.description)?;

    let category = CreateCategory {
        name: body.name,
        description: body.description,
    };
    let category_id = store.create_category(&category).await?;

    Ok(Json(CategoryCreated {
        message: "Category added successfully",
        category_id,
    }))
}
