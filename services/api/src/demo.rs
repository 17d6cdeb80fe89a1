use chrono::NaiveDate;
use clap::Args;
use lumen::brotherhood::{
    BrotherhoodService, BulkDuesForm, CeremonyForm, DuesForm, InMemoryBrotherhood,
    InMemoryIdentityDirectory, MemberForm, ParticipantForm, RoleAssignmentForm,
    STANDARD_CEREMONY_TYPES, STANDARD_ROLES,
};
use lumen::brotherhood::validation::parse_date;
use lumen::error::AppError;
use std::sync::Arc;

const DEMO_ADMIN: &str = "secretaria";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the reference date used for ages and dues (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Skip the ceremony and participation portion of the demo.
    #[arg(long)]
    pub(crate) skip_ceremonies: bool,
    /// Print the closing statistics as JSON instead of a text summary.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_reference_listing() {
    println!("Standard roles");
    for role in STANDARD_ROLES {
        println!("- {role}");
    }
    println!("\nStandard ceremony types");
    for kind in STANDARD_CEREMONY_TYPES {
        println!("- {kind}");
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        skip_ceremonies,
        json,
    } = args;

    let mut service = BrotherhoodService::new(
        Arc::new(InMemoryBrotherhood::new()),
        Arc::new(InMemoryIdentityDirectory::new()),
    );
    if let Some(today) = today {
        service = service.with_today(move || today);
    }
    println!("Brotherhood demo (evaluated {})", service.today());
    let seeded = service.seed_reference_data()?;
    println!(
        "Reference data: {} roles, {} ceremony types",
        seeded.roles_created, seeded.ceremony_types_created
    );

    let admin = service.bootstrap_admin(DEMO_ADMIN, "demo-only-password")?;
    println!("Administrator '{}' ready", admin.username);

    let roster = [
        ("Manuel", "Ruiz Ortega", "12345678A", "1980-03-02", "1995-04-10"),
        ("Lucía", "Martín Cano", "87654321B", "1992-11-21", "2010-02-14"),
        ("Rafael", "Gómez Vidal", "11223344C", "1958-07-30", "1972-03-19"),
    ];
    let mut members = Vec::with_capacity(roster.len());
    for (name, surname, national_id, birth_date, join_date) in roster {
        let member = service.create_member(
            &admin,
            &MemberForm {
                name: name.to_string(),
                surname: surname.to_string(),
                national_id: national_id.to_string(),
                birth_date: birth_date.to_string(),
                join_date: join_date.to_string(),
                ..MemberForm::default()
            },
        )?;
        println!("- Enrolled #{} {}", member.id, member.full_name());
        members.push(member);
    }

    let catalogue = service.list_roles(&admin)?;
    if let Some(role) = catalogue.roles.iter().find(|role| role.name == "Hermano Mayor") {
        let result = service.assign_role(
            &admin,
            members[2].id,
            &RoleAssignmentForm {
                role: role.id.to_string(),
                start_date: "2024-01-01".to_string(),
                ..RoleAssignmentForm::default()
            },
        )?;
        println!(
            "- {} holds '{}' ({:?})",
            members[2].full_name(),
            role.name,
            result.outcome
        );
    }

    let ids = members
        .iter()
        .map(|member| member.id.to_string())
        .collect::<Vec<_>>();
    let bulk = service.create_bulk_dues(
        &admin,
        &BulkDuesForm {
            members: ids,
            amount: "25.00".to_string(),
            period: "first-half".to_string(),
            payment_state: "pending".to_string(),
        },
    )?;
    println!("- Issued {} first-half dues", bulk.created);
    if let Some(first) = bulk.dues.first() {
        service.update_dues(
            &admin,
            first.id,
            &DuesForm {
                amount: first.amount.to_string(),
                period: "first-half".to_string(),
                payment_state: "paid".to_string(),
            },
        )?;
        println!("  Dues #{} marked as paid", first.id);
    }

    if !skip_ceremonies {
        let types = service.list_ceremony_types(&admin)?;
        if let Some(kind) = types.ceremony_types.first() {
            let ceremony = service.create_ceremony(
                &admin,
                &CeremonyForm {
                    ceremony_type: kind.id.to_string(),
                    description: "Salida procesional".to_string(),
                    ..CeremonyForm::default()
                },
            )?;
            let carrier = catalogue.roles.iter().find(|role| role.name == "Costalero");
            if let Some(role) = carrier {
                for member in &members[..2] {
                    service.assign_participant(
                        &admin,
                        ceremony.id,
                        &ParticipantForm {
                            member: member.id.to_string(),
                            role: role.id.to_string(),
                            segment: "1".to_string(),
                        },
                    )?;
                }
            }
            let detail = service.ceremony_detail(&admin, ceremony.id)?;
            println!(
                "- Ceremony #{} ({}) with {} participants",
                ceremony.id,
                detail.ceremony.type_name,
                detail.participants.len()
            );
        }
    }

    let statistics = service.statistics(&admin)?;
    if json {
        match serde_json::to_string_pretty(&statistics) {
            Ok(payload) => println!("\n{payload}"),
            Err(err) => println!("\nStatistics payload unavailable: {err}"),
        }
        return Ok(());
    }

    println!("\nStatistics");
    for entry in &statistics.members_by_state {
        println!("- {}: {}", entry.state_label, entry.count);
    }
    println!(
        "Dues: {} issued, {} paid, {} pending (total {})",
        statistics.total_dues,
        statistics.amount_paid,
        statistics.amount_pending,
        statistics.total_amount
    );
    println!("Ceremonies: {}", statistics.total_ceremonies);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_end_to_end() {
        run_demo(DemoArgs::default()).expect("demo completes");
        run_demo(DemoArgs {
            today: NaiveDate::from_ymd_opt(2025, 6, 1),
            skip_ceremonies: true,
            json: true,
        })
        .expect("demo completes without ceremonies");
    }
}
