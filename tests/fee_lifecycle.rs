use financebook_fee_engine::{
    entities::{FeePlan, Interval, IntervalCurve, PaymentItem, PaymentItemId, RegressionPoint, UserId},
    util::{fit_regression, validate_formula, FeeEngine},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn worked_example_engine(user: UserId) -> FeeEngine {
    let engine = FeeEngine::new();
    // 3 of 10 items fall in [0, 100): frequency 0.3.
    engine.put_payment_item(PaymentItem::new(PaymentItemId(1), user, dec!(-80)));
    engine.put_payment_item(PaymentItem::new(PaymentItemId(2), user, dec!(42)));
    engine.put_payment_item(PaymentItem::new(PaymentItemId(3), user, dec!(-10)));
    for id in 4..=10 {
        engine.put_payment_item(PaymentItem::new(PaymentItemId(id), user, dec!(250)));
    }
    engine
}

fn worked_example_plan(user: UserId) -> FeePlan {
    FeePlan::table(
        user,
        vec![
            Interval::new(
                dec!(0),
                Some(IntervalCurve {
                    max_fee_fraction: 0.05,
                    coefficients: vec![0.0, 0.1],
                }),
            ),
            Interval::new(dec!(100), None),
        ],
    )
}

#[tokio::test]
async fn full_fee_lifecycle() {
    let user = UserId(1);
    let engine = worked_example_engine(user);
    engine.set_fee_plan(worked_example_plan(user)).await.unwrap();

    // Preview has no side effects.
    assert_eq!(engine.compute_fee(dec!(-80), user).await.unwrap(), dec!(2.40));
    assert!(engine.fee_record(PaymentItemId(1)).is_none());

    // Apply: amount adjusted, record written.
    let fee = engine.apply_fee(PaymentItemId(1), user).await.unwrap();
    assert_eq!(fee, dec!(2.40));
    assert_eq!(engine.payment_item(PaymentItemId(1)).unwrap().amount, dec!(-82.40));
    let record = engine.fee_record(PaymentItemId(1)).unwrap();
    assert_eq!(record.fee_amount, dec!(2.40));
    assert_eq!(record.original_amount, dec!(-80));

    // Refund: record gone, fee reported once, idempotent thereafter.
    assert_eq!(engine.refund_fee(PaymentItemId(1)).await.unwrap(), dec!(2.40));
    assert!(engine.fee_record(PaymentItemId(1)).is_none());
    assert_eq!(engine.refund_fee(PaymentItemId(1)).await.unwrap(), Decimal::ZERO);
    // Refund does not restore the amount; that is the caller's decision.
    assert_eq!(engine.payment_item(PaymentItemId(1)).unwrap().amount, dec!(-82.40));
}

#[tokio::test]
async fn compute_fee_respects_cap_and_dust_invariants() {
    let user = UserId(1);
    let engine = worked_example_engine(user);
    engine.set_fee_plan(worked_example_plan(user)).await.unwrap();

    for amount in [dec!(-0.005), dec!(-0.10), dec!(-80), dec!(99.99), dec!(100), dec!(12345.67)] {
        let fee = engine.compute_fee(amount, user).await.unwrap();
        // 0 ≤ fee ≤ |amount|.
        assert!(fee >= Decimal::ZERO);
        assert!(fee <= amount.abs());
        // Never a dust fee in (0, 0.01), and always a multiple of 0.01.
        assert!(fee == Decimal::ZERO || fee >= dec!(0.01));
        assert_eq!(fee, fee.round_dp(2));
    }
}

#[tokio::test]
async fn user_without_plan_is_never_charged() {
    let engine = FeeEngine::new();
    let user = UserId(9);
    engine.put_payment_item(PaymentItem::new(PaymentItemId(1), user, dec!(-250.00)));

    assert_eq!(engine.compute_fee(dec!(-250.00), user).await.unwrap(), Decimal::ZERO);
    assert_eq!(engine.apply_fee(PaymentItemId(1), user).await.unwrap(), Decimal::ZERO);
    assert_eq!(engine.payment_item(PaymentItemId(1)).unwrap().amount, dec!(-250.00));
    assert!(engine.fee_record(PaymentItemId(1)).is_none());
}

#[tokio::test]
async fn plans_are_scoped_to_their_user() {
    let with_plan = UserId(1);
    let without_plan = UserId(2);
    let engine = worked_example_engine(with_plan);
    engine.put_payment_item(PaymentItem::new(PaymentItemId(11), without_plan, dec!(-80)));
    engine
        .set_fee_plan(worked_example_plan(with_plan))
        .await
        .unwrap();

    assert_eq!(engine.compute_fee(dec!(-80), with_plan).await.unwrap(), dec!(2.40));
    assert_eq!(
        engine.compute_fee(dec!(-80), without_plan).await.unwrap(),
        Decimal::ZERO
    );
}

#[tokio::test]
async fn fitted_curve_round_trips_into_a_plan() {
    let user = UserId(1);
    // A user clicked two points on the chart: slope 0.1 through the origin.
    let coefficients = fit_regression(
        &[
            RegressionPoint {
                frequency: 0.2,
                fee_fraction: 0.02,
            },
            RegressionPoint {
                frequency: 0.6,
                fee_fraction: 0.06,
            },
        ],
        0.05,
    );

    let engine = worked_example_engine(user);
    engine
        .set_fee_plan(FeePlan::table(
            user,
            vec![
                Interval::new(
                    dec!(0),
                    Some(IntervalCurve {
                        max_fee_fraction: 0.05,
                        coefficients,
                    }),
                ),
                Interval::new(dec!(100), None),
            ],
        ))
        .await
        .unwrap();

    // Same curve as the worked example.
    assert_eq!(engine.compute_fee(dec!(-80), user).await.unwrap(), dec!(2.40));
}

#[tokio::test]
async fn formula_plans_are_validated_then_charged() {
    let user = UserId(1);
    assert!(validate_formula("min(x * 0.02, 5)"));
    assert!(!validate_formula("system(x)"));

    let engine = FeeEngine::new();
    engine.put_payment_item(PaymentItem::new(PaymentItemId(1), user, dec!(1000)));
    engine
        .set_fee_plan(FeePlan::formula(user, "min(x * 0.02, 5)"))
        .await
        .unwrap();

    // 2% of 1000 would be 20; the formula caps itself at 5.
    assert_eq!(engine.compute_fee(dec!(1000), user).await.unwrap(), dec!(5.00));
    assert_eq!(engine.apply_fee(PaymentItemId(1), user).await.unwrap(), dec!(5.00));
    assert_eq!(engine.payment_item(PaymentItemId(1)).unwrap().amount, dec!(995.00));
}

#[tokio::test]
async fn invalid_plan_configuration_is_rejected_up_front() {
    let engine = FeeEngine::new();
    let plan = FeePlan::table(
        UserId(1),
        vec![Interval::new(dec!(0), None), Interval::new(dec!(0), None)],
    );
    assert!(engine.set_fee_plan(plan).await.is_err());
}
