use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{Ceremony, Dues, Member, MemberState, PaymentState};

/// Paid and pending sums over a set of dues; both are zero for an empty set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DuesTotals {
    pub total_paid: Decimal,
    pub total_pending: Decimal,
}

impl DuesTotals {
    pub fn from_dues<'a>(dues: impl IntoIterator<Item = &'a Dues>) -> Self {
        dues.into_iter()
            .fold(Self::default(), |mut totals, dues| {
                match dues.payment_state {
                    PaymentState::Paid => totals.total_paid += dues.amount,
                    PaymentState::Pending => totals.total_pending += dues.amount,
                }
                totals
            })
    }

    pub fn total(&self) -> Decimal {
        self.total_paid + self.total_pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateCountEntry {
    pub state: MemberState,
    pub state_label: &'static str,
    pub count: usize,
}

/// Administrator statistics page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsView {
    pub total_members: usize,
    pub active_members: usize,
    pub inactive_members: usize,
    pub suspended_members: usize,
    pub members_by_state: Vec<StateCountEntry>,
    pub total_dues: usize,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub amount_pending: Decimal,
    pub total_ceremonies: usize,
}

impl StatisticsView {
    pub fn compute(members: &[Member], dues: &[Dues], ceremonies: &[Ceremony]) -> Self {
        let count_in = |state: MemberState| {
            members
                .iter()
                .filter(|member| member.state == state)
                .count()
        };
        let members_by_state = MemberState::ALL
            .into_iter()
            .map(|state| StateCountEntry {
                state,
                state_label: state.label(),
                count: count_in(state),
            })
            .collect();
        let totals = DuesTotals::from_dues(dues);

        Self {
            total_members: members.len(),
            active_members: count_in(MemberState::Active),
            inactive_members: count_in(MemberState::Inactive),
            suspended_members: count_in(MemberState::Suspended),
            members_by_state,
            total_dues: dues.len(),
            total_amount: totals.total(),
            amount_paid: totals.total_paid,
            amount_pending: totals.total_pending,
            total_ceremonies: ceremonies.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brotherhood::domain::{DuesId, DuesPeriod, MemberId};
    use chrono::NaiveDate;

    fn dues(id: u64, cents: i64, payment_state: PaymentState) -> Dues {
        Dues {
            id: DuesId(id),
            member: MemberId(1),
            amount: Decimal::new(cents, 2),
            created_on: NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"),
            payment_state,
            period: DuesPeriod::FirstHalf,
        }
    }

    #[test]
    fn totals_split_paid_and_pending() {
        let rows = [
            dues(1, 5000, PaymentState::Paid),
            dues(2, 3000, PaymentState::Pending),
        ];
        let totals = DuesTotals::from_dues(&rows);

        assert_eq!(totals.total_paid, Decimal::new(5000, 2));
        assert_eq!(totals.total_pending, Decimal::new(3000, 2));
        assert_eq!(totals.total(), Decimal::new(8000, 2));
    }

    #[test]
    fn totals_are_zero_without_rows() {
        let totals = DuesTotals::from_dues(&[]);
        assert_eq!(totals.total_paid, Decimal::ZERO);
        assert_eq!(totals.total_pending, Decimal::ZERO);
    }

    #[test]
    fn statistics_of_an_empty_brotherhood() {
        let stats = StatisticsView::compute(&[], &[], &[]);
        assert_eq!(stats.total_members, 0);
        assert_eq!(stats.members_by_state.len(), 3);
        assert!(stats.members_by_state.iter().all(|entry| entry.count == 0));
        assert_eq!(stats.total_amount, Decimal::ZERO);
        assert_eq!(stats.total_ceremonies, 0);
    }
}
