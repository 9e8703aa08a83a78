use serde::{Deserialize, Serialize};

/**
https://documenter.getpostman.com/view/7907941/S1a32n38 (Create payment)
 */
#[derive(Serialize, Debug)]
struct CreatePaymentParams<'a> {
    /**
    Fiat price of the item.
     */
    price_amount: f32,

    /**
    Fiat currency the price is denominated in.
     */
    price_currency: &'a str,

    /**
    Crypto currency the customer pays with.
     */
    pay_currency: &'a str,

    /**
    URL the IPN notification is delivered to once the payment changes state.
     */
    ipn_callback_url: &'a str,

    /**
    Echoed back verbatim in the IPN payload; carries the chat id so the
    confirmation can be routed to the buyer.
     */
    custom_id: &'a str,

    /**
    Shown to the customer on the hosted payment page.
     */
    order_description: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct CreatePaymentResponse {
    /**
    Hosted payment page the buyer is sent to.
     */
    pub payment_url: String,
}

/**
Payment state reported by the IPN callback.
https://documenter.getpostman.com/view/7907941/S1a32n38 (Payment statuses)
 */
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(from = "String")]
pub enum PaymentStatus {
    Waiting,
    Confirming,
    /**
    The only state that releases the product.
     */
    Confirmed,
    Sending,
    PartiallyPaid,
    Finished,
    Failed,
    Refunded,
    Expired,
    /**
    Any status the platform adds later; never dispatches, never rejects.
     */
    Other,
}

impl From<String> for PaymentStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "waiting" => Self::Waiting,
            "confirming" => Self::Confirming,
            "confirmed" => Self::Confirmed,
            "sending" => Self::Sending,
            "partially_paid" => Self::PartiallyPaid,
            "finished" => Self::Finished,
            "failed" => Self::Failed,
            "refunded" => Self::Refunded,
            "expired" => Self::Expired,
            _ => Self::Other,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct PaymentNotification {
    pub payment_status: PaymentStatus,

    /**
    Correlation id supplied at creation; identifies the chat that ordered.
     */
    pub custom_id: Option<String>,
}

pub(crate) mod handler {
    use async_trait::async_trait;
    use reqwest::{RequestBuilder, Response, StatusCode};

    use crate::bot_handler::{CreatedPayment, PaymentOperations};
    use crate::external_services::nowpayments::{CreatePaymentParams, CreatePaymentResponse};

    const API_URL: &str = "https://api.nowpayments.io/v1/payment";
    const PRICE_USD: f32 = 15.0;
    const ORDER_DESCRIPTION: &str = "Ebook Digital";

    pub struct NowPaymentsClient {
        api_key: String,
        callback_url: String,
        client: reqwest::Client,
    }

    impl NowPaymentsClient {
        pub fn new(api_key: &str, callback_url: &str, client: reqwest::Client) -> Self {
            Self {
                api_key: api_key.to_string(),
                callback_url: callback_url.to_string(),
                client,
            }
        }

        fn create_payment_request(&self, chat_id: &str) -> RequestBuilder {
            let params = CreatePaymentParams {
                price_amount: PRICE_USD,
                price_currency: "usd",
                pay_currency: "usdt",
                ipn_callback_url: &self.callback_url,
                custom_id: chat_id,
                order_description: ORDER_DESCRIPTION,
            };

            self.client
                .post(API_URL)
                .header("x-api-key", &self.api_key)
                .json(&params)
        }

        async fn proceed_create_payment_response(&self, response: Response) -> CreatedPayment {
            match response.status() {
                StatusCode::CREATED => {
                    let body = response.json::<CreatePaymentResponse>().await;

                    match body {
                        Ok(body) => CreatedPayment::Succeed {
                            payment_url: body.payment_url,
                        },

                        Err(err) => CreatedPayment::Failed {
                            reason: format!("Can't deserialize response: {err}"),
                        },
                    }
                }

                StatusCode::UNAUTHORIZED => CreatedPayment::Failed {
                    reason: "Authorization error (invalid API key)".to_string(),
                },

                StatusCode::FORBIDDEN => CreatedPayment::Failed {
                    reason: "Access error (inactive account)".to_string(),
                },

                StatusCode::UNPROCESSABLE_ENTITY => CreatedPayment::Failed {
                    reason: "Validation error".to_string(),
                },

                code => CreatedPayment::Failed {
                    reason: format!("Unsupported response code: {code}"),
                },
            }
        }
    }

    #[async_trait]
    impl PaymentOperations for NowPaymentsClient {
        async fn create_payment(&self, chat_id: &str) -> CreatedPayment {
            let response = self.create_payment_request(chat_id).send().await;

            match response {
                Ok(res) => self.proceed_create_payment_response(res).await,

                Err(err) => CreatedPayment::Failed {
                    reason: format!("Can't connect to NOWPayments servers: {err}"),
                },
            }
        }
    }
}
