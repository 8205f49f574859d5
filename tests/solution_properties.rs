//! Properties every optimal campaign must satisfy, checked on the example fixture

use rustc_hash::FxHashMap;
use testresult::TestResult;

use mailshot::{fixtures::Fixture, prelude::*};

fn solve_example() -> TestResult<(Model, Solution)> {
    let fixture = Fixture::from_set("example")?;

    let model = Model::build(
        fixture.customers()?,
        fixture.probabilities()?,
        &fixture.campaign(),
    )?;

    let solved = MILPSolver::solve(&model)?;

    assert_eq!(solved.status, SolveStatus::Optimal);

    let solution = extract(&model, &solved)?;

    Ok((model, solution))
}

#[test]
fn every_customer_receives_exactly_one_variant() -> TestResult {
    let (model, solution) = solve_example()?;

    assert_eq!(solution.len(), model.customers().len());

    for row in solution.iter() {
        let sum: u8 = Variant::ALL
            .into_iter()
            .map(|variant| row.indicator(variant))
            .sum();

        assert_eq!(sum, 1, "customer {}", row.customer_id);
    }

    Ok(())
}

#[test]
fn rows_follow_input_order() -> TestResult {
    let (model, solution) = solve_example()?;

    let input: Vec<CustomerId> = model.customers().iter().map(|c| c.customer_id).collect();
    let output: Vec<CustomerId> = solution.iter().map(|row| row.customer_id).collect();

    assert_eq!(input, output);

    Ok(())
}

#[test]
fn every_segment_meets_its_minimum_share() -> TestResult {
    let (model, solution) = solve_example()?;

    for segment in model.segments().iter() {
        let mut counts: FxHashMap<Variant, usize> = FxHashMap::default();

        for &member in &segment.members {
            let variant = solution
                .rows()
                .get(member)
                .and_then(SolutionRow::variant)
                .ok_or("missing row")?;

            *counts.entry(variant).or_default() += 1;
        }

        // 10% of 9 customers rounds up to 1.
        for variant in Variant::ALL {
            assert!(
                counts.get(&variant).copied().unwrap_or_default() >= 1,
                "segment {} has no {variant}",
                segment.id
            );
        }
    }

    Ok(())
}

#[test]
fn expected_spend_stays_within_budget() -> TestResult {
    let (model, solution) = solve_example()?;

    assert!(solution.expected_spend() <= model.budget() + 1e-6);

    Ok(())
}

#[test]
fn objective_equals_lift_of_chosen_variants() -> TestResult {
    let (model, solution) = solve_example()?;

    let mut lift = 0.0;

    for (customer, row) in solution.iter().enumerate() {
        let probabilities = model.probabilities(customer).ok_or("missing probabilities")?;
        let variant = row.variant().ok_or("missing variant")?;

        lift += probabilities.get(variant) - probabilities.baseline;
    }

    assert!((solution.objective_value() - lift).abs() < 1e-6);

    Ok(())
}

#[test]
fn objective_is_never_negative() -> TestResult {
    let (_, solution) = solve_example()?;

    assert!(solution.objective_value() >= -1e-9);

    Ok(())
}
