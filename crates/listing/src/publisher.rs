//! The inventory item → offer → publish chain.

use {
    reqwest::{Client, RequestBuilder, Response, header},
    secrecy::ExposeSecret,
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    snaplist_oauth::{AuthorizedSession, OAuthClient},
    tracing::{debug, info, warn},
    url::Url,
};

use crate::{
    error::{FailureDetail, PublishError, PublishStage},
    request::{Condition, ListingRequest},
};

const MARKETPLACE_ID: &str = "EBAY_US";
const CURRENCY: &str = "USD";
const CONTENT_LANGUAGE: &str = "en-US";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InventoryItem<'a> {
    product: Product<'a>,
    condition: Condition,
    availability: Availability,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Product<'a> {
    title: &'a str,
    description: &'a str,
    image_urls: &'a [String],
    aspects: Map<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Availability {
    ship_to_location_availability: ShipToLocation,
}

#[derive(Serialize)]
struct ShipToLocation {
    quantity: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Offer<'a> {
    sku: &'a str,
    marketplace_id: &'static str,
    format: &'static str,
    listing_description: &'a str,
    available_quantity: u32,
    pricing_summary: PricingSummary,
    quantity_limit_per_buyer: u32,
    category_id: &'a str,
}

#[derive(Serialize)]
struct PricingSummary {
    price: Amount,
}

#[derive(Serialize)]
struct Amount {
    value: String,
    currency: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferCreated {
    offer_id: Option<String>,
}

/// A published listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishResult {
    pub sku: String,
    pub offer_id: String,
    /// Body of the publish response, unchanged.
    pub response: Value,
}

impl PublishResult {
    pub fn listing_id(&self) -> Option<&str> {
        self.response.get("listingId").and_then(Value::as_str)
    }
}

/// Publishes validated listings with tokens from an [`OAuthClient`].
///
/// Every call in one publish uses the endpoints of the session obtained at
/// its start. The `http` client's timeout bounds each call.
#[derive(Debug, Clone)]
pub struct ListingPublisher {
    oauth: OAuthClient,
    http: Client,
}

impl ListingPublisher {
    pub fn new(oauth: OAuthClient, http: Client) -> Self {
        Self { oauth, http }
    }

    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    /// Create the inventory item, create its offer and publish the offer.
    ///
    /// Stops at the first failing step. A failure after the inventory step
    /// leaves the earlier remote resources in place.
    pub async fn publish(&self, request: &ListingRequest) -> Result<PublishResult, PublishError> {
        let session = self.oauth.authorized_session().await.map_err(|e| {
            PublishError::new(PublishStage::Auth, FailureDetail::Auth(e.to_string()))
        })?;
        let sku = request.sku();
        info!(sku = %sku, environment = %session.environment, "publishing listing");

        self.put_inventory_item(&session, &sku, request).await?;
        let offer_id = self.create_offer(&session, &sku, request).await?;
        let response = self.publish_offer(&session, &offer_id).await?;

        info!(sku = %sku, offer_id = %offer_id, "listing published");
        Ok(PublishResult {
            sku,
            offer_id,
            response,
        })
    }

    async fn put_inventory_item(
        &self,
        session: &AuthorizedSession,
        sku: &str,
        request: &ListingRequest,
    ) -> Result<(), PublishError> {
        let stage = PublishStage::Inventory;
        let url = api_url(session, stage, &["inventory_item", sku])?;
        let item = InventoryItem {
            product: Product {
                title: request.title(),
                description: request.description(),
                image_urls: request.image_urls(),
                aspects: Map::new(),
            },
            condition: request.condition(),
            availability: Availability {
                ship_to_location_availability: ShipToLocation {
                    quantity: request.quantity(),
                },
            },
        };

        let builder = self
            .http
            .put(url)
            .header(header::CONTENT_LANGUAGE, CONTENT_LANGUAGE)
            .json(&item);
        send(session, stage, builder).await?;
        debug!(sku, "inventory item stored");
        Ok(())
    }

    async fn create_offer(
        &self,
        session: &AuthorizedSession,
        sku: &str,
        request: &ListingRequest,
    ) -> Result<String, PublishError> {
        let stage = PublishStage::Offer;
        let url = api_url(session, stage, &["offer"])?;
        let offer = Offer {
            sku,
            marketplace_id: MARKETPLACE_ID,
            format: "FIXED_PRICE",
            listing_description: request.description(),
            available_quantity: request.quantity(),
            pricing_summary: PricingSummary {
                price: Amount {
                    value: request.price().to_string(),
                    currency: CURRENCY,
                },
            },
            quantity_limit_per_buyer: 1,
            category_id: request.category_id(),
        };

        let builder = self
            .http
            .post(url)
            .header(header::CONTENT_LANGUAGE, CONTENT_LANGUAGE)
            .json(&offer);
        let resp = send(session, stage, builder).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| PublishError::transport(stage, e))?;

        let offer_id = serde_json::from_str::<OfferCreated>(&body)
            .ok()
            .and_then(|created| created.offer_id)
            .filter(|id| !id.is_empty());
        match offer_id {
            Some(id) => {
                debug!(sku, offer_id = %id, "offer created");
                Ok(id)
            },
            None => {
                warn!(sku, body = %body, "offer response carried no offerId");
                Err(PublishError::new(stage, FailureDetail::MissingOfferId))
            },
        }
    }

    async fn publish_offer(
        &self,
        session: &AuthorizedSession,
        offer_id: &str,
    ) -> Result<Value, PublishError> {
        let stage = PublishStage::Publish;
        let url = api_url(session, stage, &["offer", offer_id, "publish"])?;
        let resp = send(session, stage, self.http.post(url)).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| PublishError::transport(stage, e))?;

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

/// `{api}/sell/inventory/v1/<segments>`, each segment percent-encoded.
fn api_url(
    session: &AuthorizedSession,
    stage: PublishStage,
    segments: &[&str],
) -> Result<Url, PublishError> {
    let invalid = |msg: String| PublishError::new(stage, FailureDetail::Transport(msg));
    let mut url = Url::parse(&session.endpoints.api_base_url)
        .map_err(|e| invalid(format!("invalid api base url: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| invalid("api base url cannot carry a path".into()))?
        .pop_if_empty()
        .extend(["sell", "inventory", "v1"])
        .extend(segments);
    Ok(url)
}

async fn send(
    session: &AuthorizedSession,
    stage: PublishStage,
    builder: RequestBuilder,
) -> Result<Response, PublishError> {
    let resp = builder
        .bearer_auth(session.access_token.expose_secret())
        .send()
        .await
        .map_err(|e| {
            warn!(stage = %stage, error = %e, "platform request failed");
            PublishError::transport(stage, e)
        })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!(stage = %stage, status = status.as_u16(), "platform rejected request");
        return Err(PublishError::new(stage, FailureDetail::Status {
            status: status.as_u16(),
            body,
        }));
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::request::ListingDraft,
        mockito::Matcher,
        serde_json::json,
        snaplist_oauth::{CredentialRecord, CredentialStore, Endpoints},
        std::time::{Duration, SystemTime, UNIX_EPOCH},
    };

    const INVENTORY_PATH: &str = r"^/sell/inventory/v1/inventory_item/ITEM_Vintage_Card_(%23|#)7$";
    const OFFER_PATH: &str = "/sell/inventory/v1/offer";
    const PUBLISH_PATH: &str = "/sell/inventory/v1/offer/OFF1/publish";

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn logged_in() -> CredentialRecord {
        CredentialRecord {
            app_id: "app".into(),
            dev_id: "dev".into(),
            cert_id: "cert".into(),
            user_token: Some("TOKEN".into()),
            refresh_token: Some("R".into()),
            token_expires_at: Some(now() + 3600),
            ..Default::default()
        }
    }

    fn request() -> ListingRequest {
        ListingDraft {
            title: "Vintage Card #7".into(),
            description: "Near mint".into(),
            price: "19.99".into(),
            quantity: "2".into(),
            category_id: "261328".into(),
            condition: "USED_GOOD".into(),
            image_urls: vec!["http://192.168.1.20:5000/uploads/front.jpg".into()],
        }
        .validate()
        .unwrap()
    }

    fn publisher_for(
        base: &str,
        record: &CredentialRecord,
        http: Client,
    ) -> (tempfile::TempDir, ListingPublisher) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::with_path(dir.path().join("credentials.json"));
        store.save(record).unwrap();
        let endpoints = Endpoints::single_host(base, "https://api.sandbox.ebay.com/oauth/api_scope");
        let oauth = OAuthClient::new(store, Client::new()).with_endpoints(endpoints);
        (dir, ListingPublisher::new(oauth, http))
    }

    #[tokio::test]
    async fn no_tokens_fails_at_auth_without_remote_calls() {
        let mut server = mockito::Server::new_async().await;
        let mut untouched = Vec::new();
        for method in ["PUT", "POST", "GET"] {
            untouched.push(
                server
                    .mock(method, Matcher::Any)
                    .expect(0)
                    .create_async()
                    .await,
            );
        }
        let record = CredentialRecord {
            user_token: None,
            refresh_token: None,
            token_expires_at: None,
            ..logged_in()
        };
        let (_dir, publisher) = publisher_for(&server.url(), &record, Client::new());

        let err = publisher.publish(&request()).await.unwrap_err();
        assert_eq!(err.stage, PublishStage::Auth);
        for mock in &untouched {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn publishes_item_offer_and_listing() {
        let mut server = mockito::Server::new_async().await;
        let inventory = server
            .mock("PUT", Matcher::Regex(INVENTORY_PATH.into()))
            .match_header("authorization", "Bearer TOKEN")
            .match_header("content-language", "en-US")
            .match_body(Matcher::PartialJson(json!({
                "product": {
                    "title": "Vintage Card #7",
                    "description": "Near mint",
                    "imageUrls": ["http://192.168.1.20:5000/uploads/front.jpg"],
                    "aspects": {}
                },
                "condition": "USED_GOOD",
                "availability": {"shipToLocationAvailability": {"quantity": 2}}
            })))
            .with_status(204)
            .create_async()
            .await;
        let offer = server
            .mock("POST", OFFER_PATH)
            .match_body(Matcher::PartialJson(json!({
                "sku": "ITEM_Vintage_Card_#7",
                "marketplaceId": "EBAY_US",
                "format": "FIXED_PRICE",
                "listingDescription": "Near mint",
                "availableQuantity": 2,
                "pricingSummary": {"price": {"value": "19.99", "currency": "USD"}},
                "quantityLimitPerBuyer": 1,
                "categoryId": "261328"
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"offerId":"OFF1"}"#)
            .create_async()
            .await;
        let publish = server
            .mock("POST", PUBLISH_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"listingId":"L1"}"#)
            .create_async()
            .await;

        let (_dir, publisher) = publisher_for(&server.url(), &logged_in(), Client::new());
        let result = publisher.publish(&request()).await.unwrap();

        inventory.assert_async().await;
        offer.assert_async().await;
        publish.assert_async().await;
        assert_eq!(result.sku, "ITEM_Vintage_Card_#7");
        assert_eq!(result.offer_id, "OFF1");
        assert_eq!(result.listing_id(), Some("L1"));
    }

    #[tokio::test]
    async fn offer_failure_skips_publish() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", Matcher::Regex(INVENTORY_PATH.into()))
            .with_status(204)
            .create_async()
            .await;
        server
            .mock("POST", OFFER_PATH)
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;
        let publish = server
            .mock("POST", Matcher::Regex(r"/publish$".into()))
            .expect(0)
            .create_async()
            .await;

        let (_dir, publisher) = publisher_for(&server.url(), &logged_in(), Client::new());
        let err = publisher.publish(&request()).await.unwrap_err();

        assert_eq!(err.stage, PublishStage::Offer);
        assert_eq!(err.detail, FailureDetail::Status {
            status: 500,
            body: "internal error".into(),
        });
        publish.assert_async().await;
    }

    #[tokio::test]
    async fn offer_without_id_is_missing_offer_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", Matcher::Regex(INVENTORY_PATH.into()))
            .with_status(204)
            .create_async()
            .await;
        server
            .mock("POST", OFFER_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"warnings":[]}"#)
            .create_async()
            .await;

        let (_dir, publisher) = publisher_for(&server.url(), &logged_in(), Client::new());
        let err = publisher.publish(&request()).await.unwrap_err();

        assert_eq!(err.stage, PublishStage::Offer);
        assert_eq!(err.detail, FailureDetail::MissingOfferId);
        assert_eq!(err.to_string(), "offer: missing_offer_id");
    }

    #[tokio::test]
    async fn inventory_rejection_keeps_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", Matcher::Regex(INVENTORY_PATH.into()))
            .with_status(400)
            .with_body(r#"{"errors":[{"errorId":25002}]}"#)
            .create_async()
            .await;
        let offer = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let (_dir, publisher) = publisher_for(&server.url(), &logged_in(), Client::new());
        let err = publisher.publish(&request()).await.unwrap_err();

        assert_eq!(err.stage, PublishStage::Inventory);
        match err.detail {
            FailureDetail::Status { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("25002"));
            },
            other => panic!("unexpected detail: {other:?}"),
        }
        offer.assert_async().await;
    }

    #[tokio::test]
    async fn unresponsive_platform_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let silent = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let http = Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let (_dir, publisher) = publisher_for(&format!("http://{addr}"), &logged_in(), http);
        let err = publisher.publish(&request()).await.unwrap_err();

        assert_eq!(err.stage, PublishStage::Inventory);
        assert!(err.is_timeout());
        silent.abort();
    }
}
