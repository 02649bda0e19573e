use actix_web::{web, HttpResponse, Result};
use crate::models::{ApiResponse, StockFilter, StockView};
use crate::services::stock_service::StockService;

pub async fn list_stocks(
    service: web::Data<StockService>,
    query: web::Query<StockFilter>,
) -> Result<HttpResponse> {
    match service.list_stocks(&query).await {
        Ok(stocks) => {
            let response = ApiResponse::success(stocks);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::error!("获取股票列表失败: {}", e);
            let response = ApiResponse::<Vec<StockView>>::error(e.to_string());
            Ok(HttpResponse::InternalServerError().json(response))
        }
    }
}

pub async fn get_stock(
    service: web::Data<StockService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let stock_code = path.into_inner();

    match service.get_stock(&stock_code).await {
        Ok(Some(stock)) => Ok(HttpResponse::Ok().json(ApiResponse::success(stock))),
        Ok(None) => {
            let response = ApiResponse::<StockView>::error(format!("未找到股票 {}", stock_code));
            Ok(HttpResponse::NotFound().json(response))
        }
        Err(e) => {
            log::error!("获取股票 {} 失败: {}", stock_code, e);
            let response = ApiResponse::<StockView>::error(e.to_string());
            Ok(HttpResponse::InternalServerError().json(response))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/stocks")
            .route("", web::get().to(list_stocks))
            .route("/{code}", web::get().to(get_stock))
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::services::naver::extractor::fixtures;
    use actix_web::{test, App};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service_for(server: &MockServer) -> web::Data<StockService> {
        let mut config = AppConfig::default();
        config.scrape.base_url = format!("{}/sise/sise_market_sum.naver", server.uri());
        web::Data::new(StockService::new(&config).unwrap())
    }

    #[actix_web::test]
    async fn test_list_and_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(fixtures::listing_page(), "text/html; charset=utf-8"))
            .mount(&server)
            .await;

        let app = test::init_service(
            App::new().app_data(service_for(&server).await).configure(config),
        )
        .await;

        // 固定数据的 PER 均为 12.34
        let req = test::TestRequest::get().uri("/stocks?per_min=10&per_max=20").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"][0]["market_cap_display"], "359조 2,150억원");

        let req = test::TestRequest::get().uri("/stocks/005930").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["name"], "삼성전자");

        let req = test::TestRequest::get().uri("/stocks/999999").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let app = test::init_service(
            App::new().app_data(service_for(&server).await).configure(config),
        )
        .await;

        let req = test::TestRequest::get().uri("/stocks").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
