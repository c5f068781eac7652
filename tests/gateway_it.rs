#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use booking_gateway::{
	_preludet::*,
	auth::{Credential, CredentialScope, ProviderId, TenantId},
	booking::{BookingQuery, RawBooking, RawInvoiceItem},
	error::ErrorKind,
	store::CredentialStore,
	upstream::UpstreamDescriptor,
};

const ACCESS: &str = "live-access";

fn build_descriptor(server: &MockServer) -> UpstreamDescriptor {
	let provider_id = ProviderId::new("mock-bookings")
		.expect("Provider identifier should be valid for gateway tests.");

	UpstreamDescriptor::builder(provider_id)
		.api_base(Url::parse(&server.url("/v2/")).expect("Mock API base should parse successfully."))
		.token_endpoint(
			Url::parse(&server.url("/v2/authentication/token"))
				.expect("Mock token endpoint should parse successfully."),
		)
		.build()
		.expect("Upstream descriptor should build successfully.")
}

async fn tenant_with_credential(store: &dyn CredentialStore, id: &str) -> TenantId {
	let tenant = TenantId::new(id).expect("Tenant identifier should be valid.");
	let credential = Credential::builder(CredentialScope::Tenant(tenant.clone()))
		.access_token(ACCESS)
		.refresh_token("live-refresh")
		.build()
		.expect("Credential fixture should build successfully.");

	store.put(credential).await.expect("Failed to seed credential into the store.");

	tenant
}

fn new_booking() -> RawBooking {
	RawBooking {
		property_id: Some(json!("17")),
		room_id: Some(json!(42)),
		arrival: Some("2025-07-01".into()),
		departure: Some("2025-07-04".into()),
		first_name: Some("Ada".into()),
		last_name: Some("Lovelace".into()),
		email: Some("   ".into()),
		invoice: vec![
			RawInvoiceItem {
				description: Some("Room".into()),
				qty: Some(json!(1)),
				amount: Some(json!(300)),
			},
			RawInvoiceItem { description: None, qty: None, amount: Some(json!("50")) },
		],
		..RawBooking::default()
	}
}

#[tokio::test]
async fn create_sends_derived_price_and_returns_reported_id() {
	let server = MockServer::start_async().await;
	let (gateway, store) = build_reqwest_test_gateway(build_descriptor(&server));
	let tenant = tenant_with_credential(store.as_ref(), "tenant-create").await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v2/bookings")
				.header("authorization", "Bearer live-access")
				.header("content-type", "application/json")
				.body_includes("\"price\":350")
				.body_includes("\"status\":\"confirmed\"")
				.body_includes("\"propertyId\":17")
				.body_excludes("\"email\"");
			then.status(201)
				.header("content-type", "application/json")
				.body("[{\"success\":true,\"new\":{\"id\":981}}]");
		})
		.await;
	let receipt = gateway
		.create_booking(Some(&tenant), &new_booking())
		.await
		.expect("Create should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(receipt.id, Some(981));
	assert_eq!(receipt.result["success"], json!(true));
}

#[tokio::test]
async fn create_surfaces_upstream_rejections_as_validation() {
	let server = MockServer::start_async().await;
	let (gateway, store) = build_reqwest_test_gateway(build_descriptor(&server));
	let tenant = tenant_with_credential(store.as_ref(), "tenant-conflict").await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/v2/bookings");
			then.status(200).header("content-type", "application/json").body(
				"{\"bookings\":[{\"success\":false,\"errors\":[{\"message\":\"date conflict\"}]}]}",
			);
		})
		.await;

	let failure = gateway
		.create_booking(Some(&tenant), &new_booking())
		.await
		.expect_err("Upstream rejection should fail the create.");

	assert_eq!(failure.kind, ErrorKind::Validation);
	assert_eq!(failure.message, "date conflict");
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_call() {
	let server = MockServer::start_async().await;
	let (gateway, store) = build_reqwest_test_gateway(build_descriptor(&server));
	let tenant = tenant_with_credential(store.as_ref(), "tenant-invalid").await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/v2/bookings");
			then.status(200).body("[{\"success\":true}]");
		})
		.await;
	let raw = RawBooking { last_name: None, ..new_booking() };
	let failure = gateway
		.create_booking(Some(&tenant), &raw)
		.await
		.expect_err("A booking without a last name must be rejected.");

	assert_eq!(failure.kind, ErrorKind::Validation);
	assert_eq!(failure.message, "lastName is required");

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn update_keeps_empty_notes_and_falls_back_to_requested_id() {
	let server = MockServer::start_async().await;
	let (gateway, store) = build_reqwest_test_gateway(build_descriptor(&server));
	let tenant = tenant_with_credential(store.as_ref(), "tenant-update").await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v2/bookings")
				.body_includes("\"id\":981")
				.body_includes("\"notes\":\"\"")
				.body_includes("\"roomId\":42")
				.body_excludes("\"price\"");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"success\":true,\"modified\":{\"notes\":\"\"}}]");
		})
		.await;
	let patch = RawBooking {
		property_id: Some(json!(17)),
		room_id: Some(json!("42")),
		notes: Some(String::new()),
		..RawBooking::default()
	};
	let receipt = gateway
		.update_booking(Some(&tenant), 981, &patch)
		.await
		.expect("Update should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(receipt.id, Some(981));
}

#[tokio::test]
async fn cancel_is_limited_to_the_direct_channel() {
	let server = MockServer::start_async().await;
	let (gateway, store) = build_reqwest_test_gateway(build_descriptor(&server));
	let tenant = tenant_with_credential(store.as_ref(), "tenant-cancel").await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v2/bookings")
				.body_includes("\"id\":555")
				.body_includes("\"status\":\"cancelled\"");
			then.status(200).header("content-type", "application/json").body("[{\"success\":true}]");
		})
		.await;
	let failure = gateway
		.cancel_booking(Some(&tenant), 555, Some("Booking.com"), Some(17), Some(42))
		.await
		.expect_err("Channel bookings must not be cancelled here.");

	assert_eq!(failure.kind, ErrorKind::Permission);

	let failure = gateway
		.cancel_booking(Some(&tenant), 555, None, Some(17), Some(42))
		.await
		.expect_err("Bookings without a channel must not be cancelled here.");

	assert_eq!(failure.kind, ErrorKind::Permission);

	mock.assert_calls_async(0).await;

	let ack = gateway
		.cancel_booking(Some(&tenant), 555, Some("Direct Booking"), Some(17), Some(42))
		.await
		.expect("Direct bookings should be cancellable.");

	assert_eq!(ack.id, 555);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn blank_channel_markers_never_authorize_cancellation() {
	let server = MockServer::start_async().await;
	let (gateway, store) = build_reqwest_test_gateway(build_descriptor(&server));
	let tenant = tenant_with_credential(store.as_ref(), "tenant-blank-marker").await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/v2/bookings");
			then.status(200).header("content-type", "application/json").body("[{\"success\":true}]");
		})
		.await;
	let mut gateway = gateway.with_direct_channel_marker("   ");

	assert_eq!(gateway.direct_channel_marker, "direct");

	let failure = gateway
		.cancel_booking(Some(&tenant), 556, Some("Booking.com"), Some(17), Some(42))
		.await
		.expect_err("A blank marker must not be installed.");

	assert_eq!(failure.kind, ErrorKind::Permission);

	gateway.direct_channel_marker = String::new();

	for channel in ["Booking.com", "", "Direct"] {
		let failure = gateway
			.cancel_booking(Some(&tenant), 556, Some(channel), Some(17), Some(42))
			.await
			.expect_err("An empty marker must match no channel.");

		assert_eq!(failure.kind, ErrorKind::Permission);
	}

	mock.assert_calls_async(0).await;

	let gateway = gateway.with_direct_channel_marker(" Website ");

	assert!(gateway.is_direct_channel(Some("Own website")));
	assert!(!gateway.is_direct_channel(Some("Booking.com")));
}

#[tokio::test]
async fn list_sends_filters_and_decodes_reservations() {
	let server = MockServer::start_async().await;
	let (gateway, store) = build_reqwest_test_gateway(build_descriptor(&server));
	let tenant = tenant_with_credential(store.as_ref(), "tenant-list").await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v2/bookings")
				.query_param("propertyId", "17")
				.query_param("arrivalFrom", "2025-07-01")
				.query_param("includeInvoice", "true");
			then.status(200).header("content-type", "application/json").body(
				"[{\"id\":\"5\",\"propertyId\":17,\"firstName\":\"Ada\",\"referer\":\"Direct\",\"channelCode\":\"web\"}]",
			);
		})
		.await;
	let query = BookingQuery {
		property_id: Some(17),
		arrival_from: Some("2025-07-01".into()),
		include_invoice: true,
		..BookingQuery::default()
	};
	let reservations =
		gateway.list_bookings(Some(&tenant), &query).await.expect("List should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(reservations.len(), 1);
	assert_eq!(reservations[0].id, 5);
	assert_eq!(reservations[0].property_id, Some(17));
	assert_eq!(reservations[0].extra.get("channelCode"), Some(&json!("web")));
}

#[tokio::test]
async fn unknown_envelopes_and_outages_map_to_their_kinds() {
	let server = MockServer::start_async().await;
	let (gateway, store) = build_reqwest_test_gateway(build_descriptor(&server));
	let tenant = tenant_with_credential(store.as_ref(), "tenant-shapes").await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/v2/bookings");
			then.status(200).header("content-type", "application/json").body("{\"ok\":true}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/bookings");
			then.status(503).header("retry-after", "30").body("maintenance");
		})
		.await;

	let failure = gateway
		.create_booking(Some(&tenant), &new_booking())
		.await
		.expect_err("An unknown envelope must not be treated as success.");

	assert_eq!(failure.kind, ErrorKind::UnexpectedShape);

	let failure = gateway
		.list_bookings(Some(&tenant), &BookingQuery::default())
		.await
		.expect_err("A 503 must fail the list.");

	assert_eq!(failure.kind, ErrorKind::UpstreamUnavailable);
}

#[tokio::test]
async fn redirects_are_returned_instead_of_followed() {
	let server = MockServer::start_async().await;
	let (gateway, store) = build_reqwest_test_gateway(build_descriptor(&server));
	let tenant = tenant_with_credential(store.as_ref(), "tenant-redirect").await;
	let elsewhere = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/elsewhere");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let redirect = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/bookings");
			then.status(302).header("location", server.url("/v2/elsewhere"));
		})
		.await;
	let failure = gateway
		.list_bookings(Some(&tenant), &BookingQuery::default())
		.await
		.expect_err("A redirect must not be treated as a booking list.");

	assert_eq!(failure.kind, ErrorKind::UnexpectedShape);

	redirect.assert_calls_async(1).await;
	elsewhere.assert_calls_async(0).await;
}

#[tokio::test]
async fn slow_upstreams_are_cut_off_by_the_request_timeout() {
	let server = MockServer::start_async().await;
	let (mut gateway, store) = build_reqwest_test_gateway(build_descriptor(&server));
	let tenant = tenant_with_credential(store.as_ref(), "tenant-slow").await;

	gateway.client.http_client =
		Arc::new(test_reqwest_http_client_with_timeout(Duration::milliseconds(200)));

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/bookings");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_secs(3))
				.body("[]");
		})
		.await;

	let started = std::time::Instant::now();
	let failure = gateway
		.list_bookings(Some(&tenant), &BookingQuery::default())
		.await
		.expect_err("A call slower than the bound must fail.");

	assert_eq!(failure.kind, ErrorKind::UpstreamUnavailable);
	assert!(started.elapsed() < std::time::Duration::from_secs(2));
}

#[tokio::test]
async fn failure_details_never_carry_credentials() {
	let server = MockServer::start_async().await;
	let (gateway, store) = build_reqwest_test_gateway(build_descriptor(&server));
	let tenant = tenant_with_credential(store.as_ref(), "tenant-redact").await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/v2/bookings");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"errors\":[\"bad request\"],\"token\":\"leaked-secret\"}");
		})
		.await;

	let failure = gateway
		.create_booking(Some(&tenant), &new_booking())
		.await
		.expect_err("Top-level errors should fail the create.");

	assert_eq!(failure.kind, ErrorKind::Validation);
	assert_eq!(failure.message, "bad request");
	assert_eq!(failure.details["token"], json!("<redacted>"));
	assert!(!failure.to_string().contains("leaked-secret"));
}

#[tokio::test]
async fn outage_body_previews_are_scrubbed() {
	let server = MockServer::start_async().await;
	let (gateway, store) = build_reqwest_test_gateway(build_descriptor(&server));
	let tenant = tenant_with_credential(store.as_ref(), "tenant-preview").await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/bookings");
			then.status(502).body("bad gateway for Authorization: Bearer live-access");
		})
		.await;

	let failure = gateway
		.list_bookings(Some(&tenant), &BookingQuery::default())
		.await
		.expect_err("A 502 must fail the list.");

	assert_eq!(failure.kind, ErrorKind::UpstreamUnavailable);
	assert_eq!(failure.details["body"], json!("bad gateway for Authorization: Bearer <redacted>"));
	assert!(!failure.details.to_string().contains(ACCESS));
}
