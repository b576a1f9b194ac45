use std::sync::Mutex;

use reqwest::StatusCode;
use serde::Serialize;

use crate::{
    FriendInviteId, PaymentId, SessionToken, TripId, TripInviteId, UserId,
    requests, responses,
};

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// An API client for interfacing with the server.
///
/// Holds the bearer token from the most recent login; `login` replaces it,
/// so tests switch users by logging in again.
pub struct APIClient {
    pub address: String,
    pub inner_client: reqwest::Client,
    token: Mutex<Option<SessionToken>>,
}

/// Helper methods for http actions
impl APIClient {
    pub fn new(address: String, inner_client: reqwest::Client) -> Self {
        Self {
            address,
            inner_client,
            token: Mutex::new(None),
        }
    }

    pub fn set_token(&self, token: SessionToken) {
        *self.token.lock().unwrap() = Some(token);
    }

    pub fn clear_token(&self) {
        *self.token.lock().unwrap() = None;
    }

    fn format_url(&self, path: &str) -> String {
        format!("{}/{path}", &self.address)
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        match *self.token.lock().unwrap() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        let request = self.inner_client.post(self.format_url(path)).json(body);
        self.authorize(request).send().await
    }

    async fn empty_post(&self, path: &str) -> ReqwestResult {
        let request = self.inner_client.post(self.format_url(path));
        self.authorize(request).send().await
    }

    async fn patch(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        let request =
            self.inner_client.patch(self.format_url(path)).json(body);
        self.authorize(request).send().await
    }

    async fn empty_get(&self, path: &str) -> ReqwestResult {
        let request = self.inner_client.get(self.format_url(path));
        self.authorize(request).send().await
    }

    async fn empty_delete(&self, path: &str) -> ReqwestResult {
        let request = self.inner_client.delete(self.format_url(path));
        self.authorize(request).send().await
    }
}

/// Methods on the server API
impl APIClient {
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let response = self.empty_get("health_check").await?;
        ok_empty(response).await
    }

    pub async fn register(
        &self,
        details: &requests::Register,
    ) -> Result<responses::User, ClientError> {
        let response = self.post("auth/register", details).await?;
        ok_body(response).await
    }

    /// Log in and remember the returned bearer token for later calls.
    pub async fn login(
        &self,
        details: &requests::Login,
    ) -> Result<responses::LoginResponse, ClientError> {
        let response = self.post("auth/login", details).await?;
        let login: responses::LoginResponse = ok_body(response).await?;
        self.set_token(login.token);
        Ok(login)
    }

    pub async fn me(&self) -> Result<responses::User, ClientError> {
        let response = self.empty_get("users/me").await?;
        ok_body(response).await
    }

    pub async fn search_users(
        &self,
        query: &str,
    ) -> Result<Vec<responses::UserIdentity>, ClientError> {
        let response = self
            .empty_get(&format!("users/search?q={}", urlencode(query)))
            .await?;
        ok_body(response).await
    }

    pub async fn create_trip(
        &self,
        details: &requests::CreateTrip,
    ) -> Result<responses::TripDetail, ClientError> {
        let response = self.post("trips", details).await?;
        ok_body(response).await
    }

    pub async fn get_trips(
        &self,
    ) -> Result<Vec<responses::TripSummary>, ClientError> {
        let response = self.empty_get("trips").await?;
        ok_body(response).await
    }

    pub async fn get_trip(
        &self,
        trip_id: &TripId,
    ) -> Result<responses::TripDetail, ClientError> {
        let response = self.empty_get(&format!("trips/{trip_id}")).await?;
        ok_body(response).await
    }

    pub async fn update_trip(
        &self,
        trip_id: &TripId,
        details: &requests::UpdateTrip,
    ) -> Result<responses::TripDetail, ClientError> {
        let response =
            self.patch(&format!("trips/{trip_id}"), details).await?;
        ok_body(response).await
    }

    pub async fn invite_member(
        &self,
        trip_id: &TripId,
        details: &requests::InviteTripMember,
    ) -> Result<responses::TripInvite, ClientError> {
        let response = self
            .post(&format!("trips/{trip_id}/members"), details)
            .await?;
        ok_body(response).await
    }

    pub async fn get_trip_invites(
        &self,
    ) -> Result<Vec<responses::TripInvite>, ClientError> {
        let response = self.empty_get("invites").await?;
        ok_body(response).await
    }

    pub async fn accept_trip_invite(
        &self,
        invite_id: &TripInviteId,
    ) -> Result<(), ClientError> {
        let response =
            self.empty_post(&format!("invites/{invite_id}/accept")).await?;
        ok_empty(response).await
    }

    pub async fn decline_trip_invite(
        &self,
        invite_id: &TripInviteId,
    ) -> Result<(), ClientError> {
        let response = self
            .empty_post(&format!("invites/{invite_id}/decline"))
            .await?;
        ok_empty(response).await
    }

    pub async fn get_balances(
        &self,
        trip_id: &TripId,
    ) -> Result<responses::TripBalances, ClientError> {
        let response =
            self.empty_get(&format!("trips/{trip_id}/balances")).await?;
        ok_body(response).await
    }

    pub async fn create_expense(
        &self,
        trip_id: &TripId,
        details: &requests::CreateExpense,
    ) -> Result<responses::Expense, ClientError> {
        let response = self
            .post(&format!("trips/{trip_id}/expenses"), details)
            .await?;
        ok_body(response).await
    }

    pub async fn get_expenses(
        &self,
        trip_id: &TripId,
    ) -> Result<Vec<responses::Expense>, ClientError> {
        let response =
            self.empty_get(&format!("trips/{trip_id}/expenses")).await?;
        ok_body(response).await
    }

    pub async fn create_payment(
        &self,
        trip_id: &TripId,
        details: &requests::CreatePayment,
    ) -> Result<responses::Payment, ClientError> {
        let response = self
            .post(&format!("trips/{trip_id}/payments"), details)
            .await?;
        ok_body(response).await
    }

    pub async fn confirm_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<responses::Payment, ClientError> {
        let response = self
            .empty_post(&format!("payments/{payment_id}/confirm"))
            .await?;
        ok_body(response).await
    }

    pub async fn decline_payment(
        &self,
        payment_id: &PaymentId,
        details: &requests::DeclinePayment,
    ) -> Result<responses::Payment, ClientError> {
        let response = self
            .post(&format!("payments/{payment_id}/decline"), details)
            .await?;
        ok_body(response).await
    }

    pub async fn delete_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<(), ClientError> {
        let response =
            self.empty_delete(&format!("payments/{payment_id}")).await?;
        ok_empty(response).await
    }

    pub async fn pending_payments(
        &self,
    ) -> Result<Vec<responses::Payment>, ClientError> {
        let response = self.empty_get("payments/pending").await?;
        ok_body(response).await
    }

    pub async fn get_friends(
        &self,
    ) -> Result<Vec<responses::Friend>, ClientError> {
        let response = self.empty_get("friends").await?;
        ok_body(response).await
    }

    pub async fn add_friend(
        &self,
        details: &requests::AddFriend,
    ) -> Result<responses::FriendInvite, ClientError> {
        let response = self.post("friends", details).await?;
        ok_body(response).await
    }

    pub async fn remove_friend(
        &self,
        friend_id: &UserId,
    ) -> Result<(), ClientError> {
        let response =
            self.empty_delete(&format!("friends/{friend_id}")).await?;
        ok_empty(response).await
    }

    pub async fn get_friend_invites(
        &self,
    ) -> Result<Vec<responses::FriendInvite>, ClientError> {
        let response = self.empty_get("friends/invites").await?;
        ok_body(response).await
    }

    pub async fn accept_friend_invite(
        &self,
        invite_id: &FriendInviteId,
    ) -> Result<(), ClientError> {
        let response = self
            .empty_post(&format!("friends/invites/{invite_id}/accept"))
            .await?;
        ok_empty(response).await
    }

    pub async fn decline_friend_invite(
        &self,
        invite_id: &FriendInviteId,
    ) -> Result<(), ClientError> {
        let response = self
            .empty_post(&format!("friends/invites/{invite_id}/decline"))
            .await?;
        ok_empty(response).await
    }

    pub async fn get_activity(
        &self,
    ) -> Result<Vec<responses::ActivityEvent>, ClientError> {
        let response = self.empty_get("activity").await?;
        ok_body(response).await
    }

    pub async fn parse_receipt(
        &self,
        trip_id: &TripId,
        details: &requests::ParseReceipt,
    ) -> Result<responses::ParsedReceipt, ClientError> {
        let response = self
            .post(&format!("trips/{trip_id}/receipt/ocr"), details)
            .await?;
        ok_body(response).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An unhandled API error to display, containing response text.
    #[error("{1}")]
    APIError(StatusCode, String),
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

/// Deserialize a successful request into the desired type, or return an
/// appropriate error.
pub async fn ok_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is OK, returning a ClientError if not.
pub async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(())
}

/// Minimal query-string escaping for the search endpoint.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.'
            | b'~' => out.push(b as char),
            b' ' => out.push_str("%20"),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
