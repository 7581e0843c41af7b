use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::auth::{AuthUser, Role};
use crate::domain::payment::{
    CartItem, CheckoutResponse, CreateCheckoutRequest, Payment, PaymentStatus, PaymentType,
    VerifyResponse,
};
use crate::domain::transaction::{Transaction, TransactionStatus};
use crate::error::DomainError;
use crate::gateways::{GatewayPaymentStatus, GatewayRegistry, InitiatePaymentRequest};
use crate::lifecycle::{apply_transition, status_from_event, TransitionOutcome};
use crate::money::round2;
use crate::repo::courses_repo::CoursesRepo;
use crate::repo::payments_repo::PaymentsRepo;
use crate::repo::transactions_repo::TransactionsRepo;
use crate::service::promo_service::PromoService;

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
}

#[derive(Clone)]
pub struct PaymentService {
    pub payments_repo: PaymentsRepo,
    pub transactions_repo: TransactionsRepo,
    pub courses_repo: CoursesRepo,
    pub promo_service: PromoService,
    pub gateways: GatewayRegistry,
    pub home_currency: String,
    pub subscription_price: f64,
}

impl PaymentService {
    pub async fn checkout(
        &self,
        caller: &AuthUser,
        req: CreateCheckoutRequest,
    ) -> Result<CheckoutResponse, DomainError> {
        let (course_id, cart_items, subtotal, description) = self.resolve_items(&req).await?;

        let (promo, amount) = match &req.promo_code {
            Some(code) => {
                let validation = self
                    .promo_service
                    .validate(code, subtotal, course_id)
                    .await?;
                let amount = round2(subtotal - validation.discount);
                (Some(validation), amount)
            }
            None => (None, subtotal),
        };

        let adapter = self.gateways.by_name(&req.gateway).ok_or_else(|| {
            DomainError::InvalidState(format!("unknown payment gateway {}", req.gateway))
        })?;

        // record exists in pending before any gateway call
        let payment_id = Uuid::new_v4();
        let order_id = format!("order_{}", payment_id.simple());
        let now = Utc::now();
        let payment = Payment {
            payment_id,
            user_id: caller.user_id,
            order_id: order_id.clone(),
            payment_type: req.payment_type,
            course_id,
            cart_items,
            amount,
            original_amount: subtotal,
            promo_code: promo.as_ref().map(|p| p.code.clone()),
            promo_code_id: promo.as_ref().map(|p| p.promo_code_id),
            promo_discount: promo.as_ref().map(|p| p.discount),
            currency: self.home_currency.clone(),
            payment_method: req.payment_method.clone(),
            payment_gateway: adapter.name().to_string(),
            status: PaymentStatus::Pending,
            provider_reference: None,
            checkout_url: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.payments_repo.insert(&payment).await?;

        let charge = adapter.charge_amount(amount);
        let initiated = adapter
            .initiate_payment(InitiatePaymentRequest {
                amount_minor: charge.amount_minor,
                currency: charge.currency,
                order_id: order_id.clone(),
                description,
                first_name: req.first_name,
                last_name: req.last_name,
                email: req.email,
                phone: req.phone,
            })
            .await;

        match initiated {
            Ok(init) => {
                self.payments_repo
                    .set_initiated(payment_id, &init.provider_reference, &init.checkout_url)
                    .await?;
                Ok(CheckoutResponse {
                    payment_id,
                    order_id,
                    status: PaymentStatus::Pending,
                    amount,
                    original_amount: subtotal,
                    promo_discount: promo.map(|p| p.discount),
                    currency: self.home_currency.clone(),
                    checkout_url: Some(init.checkout_url),
                })
            }
            Err(DomainError::GatewayTimeout(reason)) => {
                // inconclusive: the provider may have created the payment.
                // Leave the record pending for webhook/verify reconciliation.
                tracing::warn!(%payment_id, %reason, "gateway initiate timed out, payment left pending");
                self.payments_repo.note_failure(payment_id, &reason).await?;
                Err(DomainError::GatewayTimeout(reason))
            }
            Err(DomainError::Gateway(reason)) => {
                self.payments_repo
                    .claim_transition(
                        payment_id,
                        PaymentStatus::Pending,
                        PaymentStatus::Failed,
                        Some(&reason),
                    )
                    .await?;
                Err(DomainError::Gateway(reason))
            }
            Err(other) => Err(other),
        }
    }

    /// Client-initiated status check against the provider. Transport errors
    /// are inconclusive: the stored status is returned unchanged.
    pub async fn verify(&self, payment_id: Uuid) -> Result<VerifyResponse, DomainError> {
        let payment = self
            .payments_repo
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("payment {payment_id} not found")))?;
        let adapter = self.gateways.by_name(&payment.payment_gateway).ok_or_else(|| {
            DomainError::Inconsistent(format!(
                "payment {} references unknown gateway {}",
                payment_id, payment.payment_gateway
            ))
        })?;
        let reference = payment.provider_reference.clone().ok_or_else(|| {
            DomainError::InvalidState(format!(
                "payment {payment_id} was never initiated with the provider"
            ))
        })?;

        let result = adapter.verify_payment(&reference).await;
        match result.event_status() {
            None => Ok(VerifyResponse {
                payment_id,
                status: payment.status,
                conclusive: false,
                message: result.message,
            }),
            Some(event) => {
                let status = self
                    .reconcile(&payment, event, result.transaction_id.clone(), result.raw)
                    .await?;
                Ok(VerifyResponse {
                    payment_id,
                    status,
                    conclusive: true,
                    message: None,
                })
            }
        }
    }

    pub async fn handle_webhook(
        &self,
        provider: &str,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookAck, DomainError> {
        let adapter = self
            .gateways
            .by_name(provider)
            .ok_or_else(|| DomainError::NotFound(format!("unknown payment gateway {provider}")))?;

        // fails closed on signature verification where the provider signs
        let event = adapter.process_webhook(payload, signature)?;

        let payment = match &event.provider_reference {
            Some(reference) => {
                self.payments_repo
                    .find_by_provider_reference(provider, reference)
                    .await?
            }
            None => None,
        };
        let payment = match payment {
            Some(p) => Some(p),
            None => match &event.order_id {
                Some(order_id) => self.payments_repo.find_by_order_id(order_id).await?,
                None => None,
            },
        };
        let payment = payment.ok_or_else(|| {
            DomainError::NotFound(format!(
                "no payment matches {} webhook event {}",
                provider, event.event_type
            ))
        })?;

        if let Some(reported) = event.amount_minor {
            let expected = adapter.charge_amount(payment.amount).amount_minor;
            if reported != expected {
                tracing::warn!(
                    payment_id = %payment.payment_id,
                    reported,
                    expected,
                    "webhook amount does not match the charged amount"
                );
            }
        }

        // a notification that carries no conclusive status (Konnect's webhook
        // is reference-only) is resolved against the provider's API instead
        // of being trusted blindly
        let mut status = event.status;
        let mut transaction_id = event.transaction_id.clone();
        let mut gateway_response = event.raw.clone();
        if status == GatewayPaymentStatus::Unknown {
            if let Some(reference) = &payment.provider_reference {
                let verified = adapter.verify_payment(reference).await;
                if let Some(resolved) = verified.event_status() {
                    status = resolved;
                    transaction_id = verified.transaction_id;
                    gateway_response = verified.raw;
                }
            }
        }

        let status = self
            .reconcile(&payment, status, transaction_id, gateway_response)
            .await?;
        Ok(WebhookAck {
            payment_id: payment.payment_id,
            status,
        })
    }

    pub async fn get_payment(
        &self,
        caller: &AuthUser,
        payment_id: Uuid,
    ) -> Result<Payment, DomainError> {
        let payment = self
            .payments_repo
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("payment {payment_id} not found")))?;
        if caller.role != Role::Admin && payment.user_id != caller.user_id {
            return Err(DomainError::Unauthorized(
                "payment belongs to another user".to_string(),
            ));
        }
        Ok(payment)
    }

    pub async fn get_transaction(
        &self,
        caller: &AuthUser,
        payment_id: Uuid,
    ) -> Result<Transaction, DomainError> {
        let payment = self.get_payment(caller, payment_id).await?;
        self.transactions_repo
            .find_by_payment(payment.payment_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("payment {payment_id} has no transaction yet"))
            })
    }

    /// Drives the stored status through the lifecycle. The conditional update
    /// makes the first writer own the completion side effects; a lost race to
    /// the same state is idempotent, a cross-terminal conflict is surfaced.
    async fn reconcile(
        &self,
        payment: &Payment,
        event: GatewayPaymentStatus,
        transaction_id: Option<String>,
        gateway_response: serde_json::Value,
    ) -> Result<PaymentStatus, DomainError> {
        let target = status_from_event(event);

        match apply_transition(payment.status, target) {
            TransitionOutcome::AlreadyApplied => Ok(payment.status),
            TransitionOutcome::Conflict { from, to } => {
                tracing::error!(
                    payment_id = %payment.payment_id,
                    from = from.as_str(),
                    to = to.as_str(),
                    "conflicting terminal transition reported by gateway"
                );
                Err(DomainError::Inconsistent(format!(
                    "payment {} is {} and cannot move to {}",
                    payment.payment_id,
                    from.as_str(),
                    to.as_str()
                )))
            }
            TransitionOutcome::Apply(next) => {
                let failure_reason = match next {
                    PaymentStatus::Failed => Some("payment failed at the gateway"),
                    PaymentStatus::Cancelled => Some("payment cancelled or expired"),
                    _ => None,
                };
                let claimed = self
                    .payments_repo
                    .claim_transition(payment.payment_id, payment.status, next, failure_reason)
                    .await?;

                if !claimed {
                    // raced with the other delivery path; re-read and judge
                    let current = self
                        .payments_repo
                        .find_by_id(payment.payment_id)
                        .await?
                        .ok_or_else(|| {
                            DomainError::NotFound(format!(
                                "payment {} disappeared mid-transition",
                                payment.payment_id
                            ))
                        })?;
                    if current.status == next {
                        return Ok(next);
                    }
                    return Err(DomainError::Inconsistent(format!(
                        "payment {} moved to {} while {} was being applied",
                        payment.payment_id,
                        current.status.as_str(),
                        next.as_str()
                    )));
                }

                match next {
                    PaymentStatus::Completed => {
                        self.finalize_completed(payment, transaction_id, gateway_response)
                            .await?;
                    }
                    PaymentStatus::Refunded => {
                        self.transactions_repo
                            .mark_refunded(payment.payment_id)
                            .await?;
                    }
                    _ => {}
                }
                Ok(next)
            }
        }
    }

    /// Runs exactly once per payment: only the writer that claimed the
    /// pending -> completed transition gets here.
    async fn finalize_completed(
        &self,
        payment: &Payment,
        transaction_id: Option<String>,
        gateway_response: serde_json::Value,
    ) -> Result<(), DomainError> {
        let now = Utc::now();
        let txn = Transaction {
            transaction_id: Uuid::new_v4(),
            payment_id: payment.payment_id,
            user_id: payment.user_id,
            course_id: payment.course_id,
            amount: payment.amount,
            currency: payment.currency.clone(),
            status: TransactionStatus::Completed,
            payment_method: payment.payment_method.clone(),
            payment_gateway: payment.payment_gateway.clone(),
            gateway_transaction_id: transaction_id,
            gateway_response: Some(gateway_response),
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
        };
        self.transactions_repo.insert(&txn).await?;

        if let Some(promo_code_id) = payment.promo_code_id {
            // a rejection here means the cap was exhausted by a concurrent
            // checkout after validation; the sale already completed, so it is
            // logged for reconciliation rather than failing the payment
            if let Err(err) = self.promo_service.apply(promo_code_id).await {
                tracing::warn!(
                    payment_id = %payment.payment_id,
                    %promo_code_id,
                    error = %err,
                    "promo usage increment rejected after completed checkout"
                );
            }
        }

        Ok(())
    }

    async fn resolve_items(
        &self,
        req: &CreateCheckoutRequest,
    ) -> Result<(Option<Uuid>, Option<Vec<CartItem>>, f64, String), DomainError> {
        match req.payment_type {
            PaymentType::CoursePurchase => {
                let course_id = req.course_id.ok_or_else(|| {
                    DomainError::InvalidState(
                        "course_id is required for a course purchase".to_string(),
                    )
                })?;
                let prices = self.courses_repo.find_prices(&[course_id]).await?;
                let course = prices.first().ok_or_else(|| {
                    DomainError::NotFound(format!("course {course_id} not found"))
                })?;
                Ok((
                    Some(course_id),
                    None,
                    round2(course.price),
                    course.title.clone(),
                ))
            }
            PaymentType::BundlePurchase => {
                let course_ids = req
                    .course_ids
                    .as_deref()
                    .filter(|ids| !ids.is_empty())
                    .ok_or_else(|| {
                        DomainError::InvalidState(
                            "course_ids are required for a bundle purchase".to_string(),
                        )
                    })?;
                let prices = self.courses_repo.find_prices(course_ids).await?;
                if prices.len() != course_ids.len() {
                    return Err(DomainError::NotFound(
                        "one or more bundle courses were not found".to_string(),
                    ));
                }
                let items: Vec<CartItem> = prices
                    .into_iter()
                    .map(|c| CartItem {
                        course_id: c.course_id,
                        title: c.title,
                        price: c.price,
                    })
                    .collect();
                let subtotal = round2(items.iter().map(|i| i.price).sum());
                let description = format!("{} course bundle", items.len());
                Ok((None, Some(items), subtotal, description))
            }
            PaymentType::Subscription => Ok((
                None,
                None,
                round2(self.subscription_price),
                "platform subscription".to_string(),
            )),
        }
    }
}
