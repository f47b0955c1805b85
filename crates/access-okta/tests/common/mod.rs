//! Shared fixtures for OktaClient integration tests.

#![allow(dead_code)]

use access_okta::{OktaClient, OktaConfig};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const TOKEN: &str = "test-api-token";

/// Client pointed at the mock server
pub fn client_for(server: &MockServer) -> OktaClient {
    OktaClient::new(&OktaConfig::new(server.uri(), TOKEN)).expect("client")
}

/// Group object as returned by the Groups API
pub fn group_json(id: &str, name: &str, description: Option<&str>) -> Value {
    json!({
        "id": id,
        "created": "2024-01-10T08:00:00.000Z",
        "lastUpdated": "2024-02-11T09:30:00.000Z",
        "lastMembershipUpdated": "2024-03-12T10:45:00.000Z",
        "objectClass": ["okta:user_group"],
        "type": "OKTA_GROUP",
        "profile": {
            "name": name,
            "description": description
        },
        "_links": {}
    })
}

/// User object as returned by the Users API
pub fn user_json(id: &str, email: &str, status: &str) -> Value {
    json!({
        "id": id,
        "status": status,
        "created": "2024-01-01T00:00:00.000Z",
        "profile": {
            "login": email,
            "email": email,
            "firstName": "Test",
            "lastName": "User"
        }
    })
}

/// Okta error body
pub fn error_json(code: &str, summary: &str) -> Value {
    json!({
        "errorCode": code,
        "errorSummary": summary,
        "errorLink": code,
        "errorId": "oae-test",
        "errorCauses": []
    })
}
