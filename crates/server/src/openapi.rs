use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

/// `price` may be a number or numeric text.
#[derive(ToSchema)]
#[allow(non_snake_case)]
pub struct CreateCoffeeDoc {
    pub name: String,
    #[schema(value_type = f64)]
    pub price: String,
    pub description: String,
    pub imageUrl: String,
    pub category: String,
}

/// At least one field is required.
#[derive(ToSchema)]
#[allow(non_snake_case)]
pub struct UpdateCoffeeDoc {
    pub name: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<String>,
    pub imageUrl: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(ToSchema)]
#[allow(non_snake_case)]
pub struct CoffeeDoc {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub imageUrl: String,
    pub category: String,
    pub updatedAt: Option<String>,
}

#[derive(ToSchema)]
pub struct CreatedDoc { pub message: String, pub id: String }

#[derive(ToSchema)]
pub struct MessageDoc { pub message: String }

#[derive(ToSchema)]
pub struct ErrorDoc { pub message: String, pub error: Option<String> }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::coffee::add_coffee,
        crate::routes::coffee::get_coffees,
        crate::routes::coffee::update_coffee,
    ),
    components(
        schemas(
            HealthResponse,
            CreateCoffeeDoc,
            UpdateCoffeeDoc,
            CoffeeDoc,
            CreatedDoc,
            MessageDoc,
            ErrorDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "coffee", description = "Coffee catalog")
    )
)]
pub struct ApiDoc;
