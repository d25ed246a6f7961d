use chrono::NaiveDate;
use credit_engine_core::schedule::amortization::generate_schedule;
use credit_engine_core::types::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Schedule Generator tests
// ===========================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn loan(
    principal: Decimal,
    rate_pct: Decimal,
    amortization_type: AmortizationType,
    frequency: Frequency,
    start: NaiveDate,
    maturity: NaiveDate,
) -> Loan {
    Loan {
        id: "loan-1".into(),
        facility_id: "fac-1".into(),
        principal_amount: principal,
        outstanding_amount: principal,
        currency: Currency::USD,
        rate_type: RateType::Fixed { rate_pct },
        current_rate_pct: rate_pct,
        amortization_type,
        payment_frequency: frequency,
        start_date: start,
        maturity_date: maturity,
        status: LoanStatus::Active,
    }
}

#[test]
fn test_million_dollar_twelve_month_scenario() {
    // $1,000,000 amortizing, 5% fixed, monthly, 12 months from 2024-01-01.
    let l = loan(
        dec!(1_000_000),
        dec!(5),
        AmortizationType::Amortizing,
        Frequency::Monthly,
        date(2024, 1, 1),
        date(2025, 1, 1),
    );
    let sched = generate_schedule(&l, None, None).unwrap().result;

    assert_eq!(sched.rows.len(), 12);

    // Equal installment ~= $85,607.44/month
    let installment = sched.rows[0].total_payment;
    assert!(
        (installment - dec!(85_607.44)).abs() <= dec!(0.05),
        "installment was {installment}"
    );
    for row in &sched.rows[..11] {
        assert_eq!(row.total_payment, installment);
    }

    // Final row closes at 0.00
    assert_eq!(sched.rows[11].closing_balance, Decimal::ZERO);
    assert_eq!(sched.total_principal, dec!(1_000_000));
}

#[test]
fn test_closure_property_across_types_and_frequencies() {
    for amortization_type in [
        AmortizationType::InterestOnly,
        AmortizationType::Amortizing,
        AmortizationType::Bullet,
    ] {
        for frequency in [
            Frequency::Monthly,
            Frequency::Quarterly,
            Frequency::SemiAnnual,
            Frequency::Annual,
        ] {
            let l = loan(
                dec!(750_000),
                dec!(6.25),
                amortization_type,
                frequency,
                date(2024, 3, 15),
                date(2029, 3, 15),
            );
            let sched = generate_schedule(&l, None, None).unwrap().result;

            assert!(!sched.rows.is_empty());
            for (i, row) in sched.rows.iter().enumerate() {
                assert_eq!(
                    row.period,
                    (i + 1) as u32,
                    "periods must be 1-based and contiguous"
                );
                assert_eq!(row.closing_balance, row.opening_balance - row.principal_payment);
            }
            for pair in sched.rows.windows(2) {
                assert_eq!(pair[0].closing_balance, pair[1].opening_balance);
            }
            let last = sched.rows.last().unwrap();
            assert!(
                last.closing_balance.abs() < dec!(0.01),
                "{amortization_type:?}/{frequency:?} left residual {}",
                last.closing_balance
            );
        }
    }
}

#[test]
fn test_interest_only_rows_match_periodic_rate() {
    let l = loan(
        dec!(500_000),
        dec!(6),
        AmortizationType::InterestOnly,
        Frequency::Quarterly,
        date(2024, 1, 1),
        date(2026, 1, 1),
    );
    let sched = generate_schedule(&l, None, None).unwrap().result;

    // periodic rate = 6% / 4 = 1.5%; interest = 500,000 * 0.015 = 7,500
    assert_eq!(sched.rows.len(), 8);
    for (i, row) in sched.rows.iter().enumerate() {
        assert_eq!(row.interest_payment, dec!(7_500));
        if i < 7 {
            assert_eq!(row.principal_payment, Decimal::ZERO);
        }
    }
    assert_eq!(sched.rows[7].principal_payment, dec!(500_000));
    assert_eq!(sched.total_interest, dec!(60_000));
}

#[test]
fn test_amortizing_interest_declines_principal_grows() {
    let l = loan(
        dec!(1_000_000),
        dec!(5),
        AmortizationType::Amortizing,
        Frequency::Monthly,
        date(2024, 1, 1),
        date(2025, 1, 1),
    );
    let sched = generate_schedule(&l, None, None).unwrap().result;

    for pair in sched.rows.windows(2) {
        assert!(pair[1].interest_payment < pair[0].interest_payment);
        assert!(pair[1].principal_payment > pair[0].principal_payment);
    }
}

#[test]
fn test_bullet_total_interest_exceeds_amortizing() {
    // A bullet loan carries the full balance all the way to maturity, so its
    // total interest must exceed the amortizing equivalent.
    let bullet = loan(
        dec!(1_000_000),
        dec!(5),
        AmortizationType::Bullet,
        Frequency::Monthly,
        date(2024, 1, 1),
        date(2025, 1, 1),
    );
    let amortizing = loan(
        dec!(1_000_000),
        dec!(5),
        AmortizationType::Amortizing,
        Frequency::Monthly,
        date(2024, 1, 1),
        date(2025, 1, 1),
    );
    let bullet_sched = generate_schedule(&bullet, None, None).unwrap().result;
    let amortizing_sched = generate_schedule(&amortizing, None, None).unwrap().result;

    assert!(bullet_sched.total_interest > amortizing_sched.total_interest);
    // Bullet: 1M * (5%/12) rounded, 12 times = 4,166.67 * 12
    assert_eq!(bullet_sched.total_interest, dec!(50_000.04));
}

#[test]
fn test_single_payment_loan_when_term_shorter_than_period() {
    // Annual frequency but only 7 months to maturity: still one period.
    let l = loan(
        dec!(250_000),
        dec!(4),
        AmortizationType::Bullet,
        Frequency::Annual,
        date(2024, 1, 1),
        date(2024, 8, 1),
    );
    let output = generate_schedule(&l, None, None).unwrap();

    assert_eq!(output.result.rows.len(), 1);
    let row = &output.result.rows[0];
    assert_eq!(row.principal_payment, dec!(250_000));
    assert_eq!(row.closing_balance, Decimal::ZERO);
    // 250k * 4% / 1 = 10,000 for the single annual period
    assert_eq!(row.interest_payment, dec!(10_000));
}

#[test]
fn test_schedule_output_serializes() {
    let l = loan(
        dec!(1_000_000),
        dec!(5),
        AmortizationType::Amortizing,
        Frequency::Monthly,
        date(2024, 1, 1),
        date(2025, 1, 1),
    );
    let output = generate_schedule(&l, None, None).unwrap();
    let json = serde_json::to_string(&output).unwrap();
    assert!(json.contains("Loan Amortization Schedule"));
}
