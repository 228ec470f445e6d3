use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::create_order,
        crate::api::get_order,
        crate::api::list_orders,
        crate::api::create_order_item,
        crate::api::get_order_item,
        crate::api::list_order_items,
        crate::api::list_items_by_product,
        crate::api::serve_openapi,
        crate::api::health
    ),
    components(
        schemas(
            crate::model::Order,
            crate::model::NewOrder,
            crate::model::OrderItem,
            crate::model::NewOrderItem,
            crate::model::ErrorBody
        )
    ),
    tags(
        (name="orders", description="Order headers"),
        (name="items", description="Order line items"),
        (name="ops", description="Health and API description")
    )
)]
pub struct ApiDoc;
