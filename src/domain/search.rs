use super::payment::Payment;
use super::status::PaymentStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletedFilter {
    #[default]
    Exclude,
    Include,
    Only,
}

/// Reporting criteria. Every unset field matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentSearch {
    /// Matches either the payer or the payee company.
    pub company_id: Option<String>,
    pub status: Option<PaymentStatus>,
    pub pg_provider: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub deleted: DeletedFilter,
}

impl PaymentSearch {
    pub fn by_payer_company(company_id: impl Into<String>) -> Self {
        Self {
            company_id: Some(company_id.into()),
            ..Self::default()
        }
    }

    pub fn by_status(status: PaymentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        let deleted_ok = match self.deleted {
            DeletedFilter::Exclude => !payment.is_deleted(),
            DeletedFilter::Include => true,
            DeletedFilter::Only => payment.is_deleted(),
        };

        deleted_ok
            && self.company_id.as_deref().is_none_or(|company| {
                payment.payer_info().company_id == company
                    || payment.payee_info().company_id == company
            })
            && self.status.is_none_or(|status| payment.status() == status)
            && self
                .pg_provider
                .as_deref()
                .is_none_or(|provider| payment.pg_info().pg_provider() == provider)
            && self.min_amount.is_none_or(|min| payment.amount() >= min)
            && self.max_amount.is_none_or(|max| payment.amount() <= max)
            && self.created_from.is_none_or(|from| payment.created_at() >= from)
            && self.created_to.is_none_or(|to| payment.created_at() < to)
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page,
            size: size.max(1),
        }
    }

    pub fn unpaged() -> Self {
        Self {
            page: 0,
            size: usize::MAX,
        }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 20)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Slices an already sorted result set.
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.size)
            .collect();
        Self {
            items,
            page: request.page,
            size: request.size,
            total,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.size.max(1))
    }
}

/// Newest first, with the identity as tie-breaker so paging is stable.
pub fn sort_newest_first(payments: &mut [Payment]) {
    payments.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id_value().cmp(b.id_value()))
    });
}
