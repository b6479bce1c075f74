//! End-to-end workflows over a real database: appointments, billing,
//! pharmacy and payroll, plus the HTTP layer with real users.
//!
//! Run with `DATABASE_URL=... cargo test -- --ignored`.

mod helpers;

use axum::http::StatusCode;
use chrono::Duration;
use helpers::*;
use hospital_backend::api;
use hospital_backend::error::AppError;
use hospital_backend::models::*;
use hospital_backend::repositories::Page;
use hospital_backend::services::clinical_service::DispenseRequest;
use hospital_backend::services::roster_service::{RosterRange, ShiftFilter};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;

// ============================================================================
// Appointments
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_appointment_lifecycle(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let patient = create_patient(&state, admin.id).await;
    let doctor = create_doctor(&state, admin.id, "MED-1001").await;

    let slot = future_slot(2, 10);
    let booked = state
        .appointments
        .book(booking(patient.patient.id, doctor.id, slot), admin.id)
        .await
        .unwrap();
    assert_eq!(booked.status, "scheduled");
    assert_eq!(booked.duration_minutes, 30);
    assert_eq!(booked.consultation_fee, Some(money("500.00")));

    let confirmed = state.appointments.confirm(booked.id, admin.id).await.unwrap();
    assert_eq!(confirmed.status, "confirmed");

    let checked_in = state.appointments.check_in(booked.id, admin.id).await.unwrap();
    assert_eq!(checked_in.status, "checked_in");
    assert!(checked_in.checked_in_at.is_some());

    let started = state.appointments.start(booked.id, admin.id).await.unwrap();
    assert_eq!(started.status, "in_progress");

    let completed = state
        .appointments
        .complete(booked.id, Some("Stable angina, review in 2 weeks".into()), admin.id)
        .await
        .unwrap();
    assert_eq!(completed.status, "completed");
    assert_eq!(
        completed.doctor_notes.as_deref(),
        Some("Stable angina, review in 2 weeks")
    );
    assert!(completed.checked_out_at.is_some());

    // Completed appointments are final
    let err = state
        .appointments
        .cancel(booked.id, None, "admin", admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_overlapping_slot_conflicts(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let patient = create_patient(&state, admin.id).await;
    let doctor = create_doctor(&state, admin.id, "MED-1002").await;

    let (date, ten) = future_slot(3, 10);
    state
        .appointments
        .book(booking(patient.patient.id, doctor.id, (date, ten)), admin.id)
        .await
        .unwrap();

    let quarter_past = ten + Duration::minutes(15);
    let err = state
        .appointments
        .book(booking(patient.patient.id, doctor.id, (date, quarter_past)), admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Back-to-back slots do not overlap
    let half_past = ten + Duration::minutes(30);
    state
        .appointments
        .book(booking(patient.patient.id, doctor.id, (date, half_past)), admin.id)
        .await
        .unwrap();

    let schedule = state.appointments.day_schedule(doctor.id, date).await.unwrap();
    assert_eq!(schedule.len(), 2);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_daily_limit_and_cancellation_frees_slot(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let patient = create_patient(&state, admin.id).await;
    let doctor = create_doctor(&state, admin.id, "MED-1003").await;
    state
        .directory
        .update_doctor(
            doctor.id,
            UpdateDoctor {
                max_appointments_per_day: Some(1),
                ..Default::default()
            },
            admin.id,
        )
        .await
        .unwrap();

    let first = state
        .appointments
        .book(booking(patient.patient.id, doctor.id, future_slot(4, 9)), admin.id)
        .await
        .unwrap();

    let err = state
        .appointments
        .book(booking(patient.patient.id, doctor.id, future_slot(4, 15)), admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));

    let cancelled = state
        .appointments
        .cancel(first.id, Some("Patient travelling".into()), "patient", admin.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(cancelled.cancelled_by.as_deref(), Some("patient"));

    state
        .appointments
        .book(booking(patient.patient.id, doctor.id, future_slot(4, 15)), admin.id)
        .await
        .unwrap();
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_unavailable_doctor_cannot_be_booked(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let patient = create_patient(&state, admin.id).await;
    let doctor = create_doctor(&state, admin.id, "MED-1004").await;
    state
        .directory
        .set_doctor_availability(doctor.id, false, admin.id)
        .await
        .unwrap();

    let err = state
        .appointments
        .book(booking(patient.patient.id, doctor.id, future_slot(1, 11)), admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_reschedule_links_old_and_new(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let patient = create_patient(&state, admin.id).await;
    let doctor = create_doctor(&state, admin.id, "MED-1005").await;

    let (date, ten) = future_slot(5, 10);
    let original = state
        .appointments
        .book(booking(patient.patient.id, doctor.id, (date, ten)), admin.id)
        .await
        .unwrap();

    // Moving within the same hour does not clash with the original slot
    let moved = state
        .appointments
        .reschedule(
            original.id,
            RescheduleAppointment {
                appointment_date: date,
                appointment_time: ten + Duration::minutes(15),
            },
            admin.id,
        )
        .await
        .unwrap();
    assert_eq!(moved.status, "scheduled");
    assert_eq!(moved.rescheduled_from, Some(original.id));
    assert_eq!(moved.reason, original.reason);

    let old = state.appointments.get(original.id).await.unwrap();
    assert_eq!(old.status, "rescheduled");
    assert_eq!(old.rescheduled_to, Some(moved.id));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_maintenance_marks_missed_appointments(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let patient = create_patient(&state, admin.id).await;
    let doctor = create_doctor(&state, admin.id, "MED-1006").await;
    create_medicine(&state, admin.id, "MED-LOW", 3).await;

    let (date, time) = future_slot(1, 8);
    let booked = state
        .appointments
        .book(booking(patient.patient.id, doctor.id, (date, time)), admin.id)
        .await
        .unwrap();

    let worker = state.maintenance_worker();
    let report = worker.run_once(date.and_time(time) - Duration::hours(1)).await.unwrap();
    assert_eq!(report.no_shows, 0);
    assert_eq!(report.low_stock, 1);

    let report = worker.run_once(date.and_time(time) + Duration::hours(2)).await.unwrap();
    assert_eq!(report.no_shows, 1);

    let missed = state.appointments.get(booked.id).await.unwrap();
    assert_eq!(missed.status, "no_show");
}

// ============================================================================
// Billing
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_invoice_payments_and_refunds(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let patient = create_patient(&state, admin.id).await;

    let input = CreateInvoice {
        patient_id: patient.patient.id,
        appointment_id: None,
        due_date: None,
        discount_percent: money("10"),
        tax_percent: money("5"),
        notes: None,
        items: vec![
            CreateInvoiceItem {
                description: "Consultation".into(),
                category: "consultation".into(),
                quantity: 1,
                unit_price: money("600.00"),
            },
            CreateInvoiceItem {
                description: "Lipid profile".into(),
                category: "lab".into(),
                quantity: 2,
                unit_price: money("200.00"),
            },
        ],
    };
    let detail = state.billing.create_invoice(input, admin.id).await.unwrap();
    let invoice = detail.invoice;
    assert_eq!(invoice.subtotal, money("1000.00"));
    assert_eq!(invoice.discount_amount, money("100.00"));
    assert_eq!(invoice.tax_amount, money("45.00"));
    assert_eq!(invoice.total_amount, money("945.00"));
    assert_eq!(invoice.status, "pending");
    assert_eq!(detail.items.len(), 2);

    let pay = |amount: &str| RecordPayment {
        amount: money(amount),
        payment_method: "upi".into(),
        transaction_id: None,
        notes: None,
    };

    let first = state
        .billing
        .record_payment(invoice.id, pay("400.00"), "Front Desk".into(), admin.id)
        .await
        .unwrap();
    assert_eq!(first.status, "completed");
    assert_eq!(first.received_by, "Front Desk");

    let partial = state.billing.get_invoice(invoice.id).await.unwrap();
    assert_eq!(partial.invoice.status, "partially_paid");
    assert_eq!(partial.invoice.balance_due, money("545.00"));

    // More than the balance is refused
    let err = state
        .billing
        .record_payment(invoice.id, pay("600.00"), "Front Desk".into(), admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));

    let second = state
        .billing
        .record_payment(invoice.id, pay("545.00"), "Front Desk".into(), admin.id)
        .await
        .unwrap();
    let paid = state.billing.get_invoice(invoice.id).await.unwrap();
    assert_eq!(paid.invoice.status, "paid");
    assert_eq!(paid.invoice.balance_due, money("0"));
    assert_eq!(paid.payments.len(), 2);

    // Refunds default to the full payment amount
    let refunded = state
        .billing
        .refund_payment(
            first.id,
            RefundPayment {
                amount: None,
                reason: "Duplicate charge".into(),
            },
            admin.id,
        )
        .await
        .unwrap();
    assert!(refunded.is_refunded);
    assert_eq!(refunded.refund_amount, Some(money("400.00")));
    let after_first = state.billing.get_invoice(invoice.id).await.unwrap();
    assert_eq!(after_first.invoice.status, "partially_paid");
    assert_eq!(after_first.invoice.paid_amount, money("545.00"));

    state
        .billing
        .refund_payment(
            second.id,
            RefundPayment {
                amount: None,
                reason: "Treatment not provided".into(),
            },
            admin.id,
        )
        .await
        .unwrap();
    let after_all = state.billing.get_invoice(invoice.id).await.unwrap();
    assert_eq!(after_all.invoice.status, "refunded");

    // A refunded payment cannot be refunded again
    let err = state
        .billing
        .refund_payment(
            first.id,
            RefundPayment {
                amount: None,
                reason: "Again".into(),
            },
            admin.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));
}

// ============================================================================
// Pharmacy
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_dispense_and_return_restore_stock(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let patient = create_patient(&state, admin.id).await;
    let medicine = create_medicine(&state, admin.id, "PCM-500", 50).await;
    let medicine_id = medicine.medicine.id;

    let request = |quantity: i32| hospital_backend::models::DispenseRequest {
        patient_id: patient.patient.id,
        items: vec![DispenseLine {
            medicine_id,
            quantity,
        }],
        discount_amount: money("0"),
        tax_amount: money("0"),
        payment_status: Some("paid".into()),
        payment_method: Some("cash".into()),
        notes: None,
    };

    let dispensation = state
        .pharmacy
        .dispense(request(5), "Pharmacist".into(), admin.id)
        .await
        .unwrap();
    assert_eq!(dispensation.total_amount, money("100.00"));
    assert_eq!(dispensation.final_amount, money("100.00"));
    assert_eq!(dispensation.status, "completed");
    assert_eq!(
        state.pharmacy.get_medicine(medicine_id).await.unwrap().medicine.stock_quantity,
        45
    );

    let err = state
        .pharmacy
        .dispense(request(100), "Pharmacist".into(), admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));
    assert_eq!(
        state.pharmacy.get_medicine(medicine_id).await.unwrap().medicine.stock_quantity,
        45
    );

    let returned = state
        .pharmacy
        .return_dispensation(dispensation.id, "Allergic reaction", admin.id)
        .await
        .unwrap();
    assert_eq!(returned.status, "returned");
    assert!(returned.is_returned);
    assert_eq!(
        state.pharmacy.get_medicine(medicine_id).await.unwrap().medicine.stock_quantity,
        50
    );

    let err = state
        .pharmacy
        .return_dispensation(dispensation.id, "Twice", admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_low_stock_report(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    create_medicine(&state, admin.id, "LOW-1", 4).await;
    create_medicine(&state, admin.id, "OK-1", 80).await;

    let low = state.pharmacy.low_stock().await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].medicine.medicine_code, "LOW-1");
    assert!(low[0].is_low_stock);
}

// ============================================================================
// Payroll
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_payroll_generate_approve_pay(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let staff = create_staff(&state, admin.id, "EMP-001").await;

    let input = || GeneratePayroll {
        staff_id: staff.id,
        month: 1,
        year: 2024,
        hra: money("5000.00"),
        pf_deduction: money("1800.00"),
        working_days: 22,
        present_days: 21,
        ..Default::default()
    };

    let payroll = state.payroll.generate(input(), admin.id).await.unwrap();
    assert_eq!(payroll.basic_salary, money("30000.00"));
    assert_eq!(payroll.gross_salary, money("35000.00"));
    assert_eq!(payroll.total_deductions, money("1800.00"));
    assert_eq!(payroll.net_salary, money("33200.00"));
    assert_eq!(payroll.status, "pending");
    assert_eq!(payroll.employee_id, "EMP-001");

    let err = state.payroll.generate(input(), admin.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let pay_request = || PayPayroll {
        payment_method: "net_banking".into(),
        transaction_id: Some("NEFT-0042".into()),
        payment_date: None,
    };

    // Pending payrolls must be approved first
    let err = state
        .payroll
        .pay(payroll.id, pay_request(), admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));

    let approved = state
        .payroll
        .approve(payroll.id, "Finance Head".into(), admin.id)
        .await
        .unwrap();
    assert_eq!(approved.status, "processed");
    assert_eq!(approved.approved_by.as_deref(), Some("Finance Head"));

    let paid = state.payroll.pay(payroll.id, pay_request(), admin.id).await.unwrap();
    assert_eq!(paid.status, "paid");
    assert_eq!(paid.payment_method.as_deref(), Some("net_banking"));
    assert!(paid.payment_date.is_some());

    let summary = state.payroll.summary(1, 2024).await.unwrap();
    assert_eq!(summary.payroll_count, 1);
    assert_eq!(summary.total_net, money("33200.00"));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_payroll_hold_resume_cancel(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let staff = create_staff(&state, admin.id, "EMP-002").await;

    let payroll = state
        .payroll
        .generate(
            GeneratePayroll {
                staff_id: staff.id,
                month: 2,
                year: 2024,
                working_days: 20,
                present_days: 20,
                ..Default::default()
            },
            admin.id,
        )
        .await
        .unwrap();

    let held = state.payroll.hold(payroll.id, admin.id).await.unwrap();
    assert_eq!(held.status, "on_hold");
    let resumed = state.payroll.resume(payroll.id, admin.id).await.unwrap();
    assert_eq!(resumed.status, "pending");
    let cancelled = state.payroll.cancel(payroll.id, admin.id).await.unwrap();
    assert_eq!(cancelled.status, "cancelled");

    let err = state.payroll.resume(payroll.id, admin.id).await.unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));

    let summary = state.payroll.summary(2, 2024).await.unwrap();
    assert_eq!(summary.payroll_count, 0);
}

// ============================================================================
// Roster
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_roster_caps_and_blocks_bookings(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let patient = create_patient(&state, admin.id).await;
    let doctor = create_doctor(&state, admin.id, "MED-2001").await;
    let shift = create_shift(&state, admin.id, "DAY").await;
    assert_eq!(shift.duration_hours, 10);

    let (capped_day, nine) = future_slot(5, 9);
    let mut entry = roster_entry(doctor.id, shift.id, capped_day);
    entry.max_appointments = Some(1);
    let capped = state.roster.create_schedule(entry, admin.id).await.unwrap();
    assert_eq!(capped.shift_name, "Day shift DAY");
    assert_eq!(capped.effective_start.to_string(), "08:00:00");

    state
        .appointments
        .book(booking(patient.patient.id, doctor.id, (capped_day, nine)), admin.id)
        .await
        .unwrap();
    let err = state
        .appointments
        .book(booking(patient.patient.id, doctor.id, future_slot(5, 11)), admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));

    // A doctor on leave cannot be booked at all
    let (leave_day, _) = future_slot(6, 9);
    let leave = state
        .roster
        .create_schedule(roster_entry(doctor.id, shift.id, leave_day), admin.id)
        .await
        .unwrap();
    let leave = state
        .roster
        .update_schedule(
            leave.schedule.id,
            UpdateSchedule {
                status: Some("ON_LEAVE".into()),
                ..Default::default()
            },
            admin.id,
        )
        .await
        .unwrap();
    assert_eq!(leave.schedule.status, "on_leave");

    let err = state
        .appointments
        .book(booking(patient.patient.id, doctor.id, future_slot(6, 9)), admin.id)
        .await
        .unwrap_err();
    match err {
        AppError::BusinessLogic(message) => assert!(message.contains("not rostered"), "{}", message),
        other => panic!("expected a business rule error, got {:?}", other),
    }

    let roster = state
        .roster
        .doctor_roster(
            doctor.id,
            RosterRange {
                from: Some(capped_day),
                to: Some(leave_day),
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(roster.len(), 2);

    // One entry per doctor, date and shift
    let err = state
        .roster
        .create_schedule(roster_entry(doctor.id, shift.id, capped_day), admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_shift_lifecycle(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let doctor = create_doctor(&state, admin.id, "MED-2002").await;
    let shift = create_shift(&state, admin.id, "EVE-1").await;

    let updated = state
        .roster
        .update_shift(
            shift.id,
            UpdateShift {
                applicable_days: Some(vec!["SAT".into(), "sun".into()]),
                grace_period_minutes: Some(5),
                ..Default::default()
            },
            admin.id,
        )
        .await
        .unwrap();
    assert_eq!(updated.applicable_days, vec!["sat".to_string(), "sun".to_string()]);
    assert_eq!(updated.grace_period_minutes, 5);

    let err = state
        .roster
        .update_shift(
            shift.id,
            UpdateShift {
                break_duration_minutes: Some(-10),
                ..Default::default()
            },
            admin.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Weekend-only shift on the next Saturday
    let mut saturday = chrono::Utc::now().date_naive() + Duration::days(1);
    while saturday.format("%a").to_string() != "Sat" {
        saturday += Duration::days(1);
    }
    let entry = state
        .roster
        .create_schedule(roster_entry(doctor.id, shift.id, saturday), admin.id)
        .await
        .unwrap();
    let err = state
        .roster
        .create_schedule(
            roster_entry(doctor.id, shift.id, saturday + Duration::days(2)),
            admin.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));

    let active = state
        .roster
        .list_shifts(
            ShiftFilter {
                status: Some("active".into()),
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(active.len(), 1);

    // Upcoming roster entries keep the shift alive
    let err = state.roster.delete_shift(shift.id, admin.id).await.unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));

    state
        .roster
        .delete_schedule(entry.schedule.id, admin.id)
        .await
        .unwrap();
    state.roster.delete_shift(shift.id, admin.id).await.unwrap();
    let err = state.roster.get_shift(shift.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ============================================================================
// Clinical records
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_prescription_create_and_dispense(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let patient = create_patient(&state, admin.id).await;
    let doctor = create_doctor(&state, admin.id, "MED-3001").await;
    let medicine = create_medicine(&state, admin.id, "AMX-250", 20).await;

    let prescription_input = |medicine_id: uuid::Uuid| -> CreatePrescription {
        serde_json::from_value(json!({
            "patient_id": patient.patient.id,
            "doctor_id": doctor.id,
            "diagnosis": "Acute sinusitis",
            "follow_up_date": (chrono::Utc::now().date_naive() + Duration::days(7)).to_string(),
            "items": [{
                "medicine_id": medicine_id,
                "dosage": "250mg",
                "frequency": "Three times daily",
                "duration": "7 days",
                "quantity": 21
            }]
        }))
        .unwrap()
    };

    let created = state
        .clinical
        .create_prescription(prescription_input(medicine.medicine.id), admin.id)
        .await
        .unwrap();
    assert!(created.prescription.prescription_number.starts_with("RX-"));
    assert_eq!(created.prescription.status, "active");
    assert!(created.prescription.follow_up_required);
    assert_eq!(created.items.len(), 1);
    assert_eq!(created.items[0].quantity, 21);

    let err = state
        .clinical
        .create_prescription(prescription_input(uuid::Uuid::new_v4()), admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let mut empty = prescription_input(medicine.medicine.id);
    empty.items.clear();
    let err = state.clinical.create_prescription(empty, admin.id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let id = created.prescription.id;
    let updated = state
        .clinical
        .update_prescription(
            id,
            UpdatePrescription {
                dietary_advice: Some("Plenty of fluids".into()),
                ..Default::default()
            },
            admin.id,
        )
        .await
        .unwrap();
    assert_eq!(updated.prescription.dietary_advice.as_deref(), Some("Plenty of fluids"));

    let open = state
        .clinical
        .list_prescriptions(
            PrescriptionFilter {
                patient_id: Some(patient.patient.id),
                is_dispensed: Some(false),
                ..Default::default()
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(open.len(), 1);

    let dispensed = state
        .clinical
        .mark_dispensed(
            id,
            DispenseRequest {
                pharmacy_notes: Some("Collected by spouse".into()),
            },
            &admin,
        )
        .await
        .unwrap();
    assert!(dispensed.prescription.is_dispensed);
    assert_eq!(dispensed.prescription.status, "completed");
    assert_eq!(dispensed.prescription.dispensed_by, Some(admin.display_name()));
    assert!(dispensed.prescription.dispensed_at.is_some());

    let err = state
        .clinical
        .mark_dispensed(id, DispenseRequest::default(), &admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));
    let err = state
        .clinical
        .update_prescription(id, UpdatePrescription::default(), admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));
    let err = state.clinical.delete_prescription(id, admin.id).await.unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_confidential_records_are_hidden_from_nurses(pool: PgPool) {
    let state = state_from_pool(pool);
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let patient = create_patient(&state, admin.id).await;
    let doctor = create_doctor(&state, admin.id, "MED-3002").await;

    let record_input = |confidential: bool| -> CreateMedicalRecord {
        serde_json::from_value(json!({
            "patient_id": patient.patient.id,
            "doctor_id": doctor.id,
            "record_type": "consultation",
            "chief_complaint": "Headache",
            "blood_pressure": "130/85",
            "temperature": "99.1",
            "is_confidential": confidential
        }))
        .unwrap()
    };

    let open = state.clinical.create_record(record_input(false), admin.id).await.unwrap();
    let sealed = state.clinical.create_record(record_input(true), admin.id).await.unwrap();
    assert!(open.record_number.starts_with("MR-"));

    let filter = MedicalRecordFilter {
        patient_id: Some(patient.patient.id),
        ..Default::default()
    };
    let seen_by_nurse = state
        .clinical
        .list_records(filter.clone(), UserRole::Nurse, Page::default())
        .await
        .unwrap();
    assert_eq!(seen_by_nurse.len(), 1);
    assert_eq!(seen_by_nurse[0].id, open.id);
    let seen_by_doctor = state
        .clinical
        .list_records(filter, UserRole::Doctor, Page::default())
        .await
        .unwrap();
    assert_eq!(seen_by_doctor.len(), 2);

    let err = state.clinical.get_record(sealed.id, UserRole::Nurse).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    state.clinical.get_record(sealed.id, UserRole::Doctor).await.unwrap();

    let noted = state
        .clinical
        .update_record(
            open.id,
            UpdateMedicalRecord {
                nurse_notes: Some("Given water".into()),
                ..Default::default()
            },
            UserRole::Nurse,
            admin.id,
        )
        .await
        .unwrap();
    assert_eq!(noted.status, "active");

    let amended = state
        .clinical
        .update_record(
            sealed.id,
            UpdateMedicalRecord {
                assessment: Some("Tension headache".into()),
                ..Default::default()
            },
            UserRole::Doctor,
            admin.id,
        )
        .await
        .unwrap();
    assert_eq!(amended.status, "amended");

    let mut bad = record_input(false);
    bad.vitals.blood_pressure = Some("high".into());
    let err = state.clinical.create_record(bad, admin.id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

// ============================================================================
// HTTP with real users
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_http_roles_and_resources(pool: PgPool) {
    let state = state_from_pool(pool);
    let app = api::router(state.clone());
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let nurse = create_user(&state, "nurse@hospital.test", UserRole::Nurse).await;
    let patient_user = create_user(&state, "patient@hospital.test", UserRole::Patient).await;
    let admin_auth = bearer(&state, admin.id);
    let nurse_auth = bearer(&state, nurse.id);
    let patient_auth = bearer(&state, patient_user.id);

    let response = app
        .clone()
        .oneshot(get("/auth/me", Some(&nurse_auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me = read_json(response).await;
    assert_eq!(me["email"], "nurse@hospital.test");
    assert_eq!(me["role"], "nurse");

    let payload = json!({
        "first_name": "Rohan",
        "last_name": "Das",
        "date_of_birth": "1975-09-30",
        "gender": "male",
        "phone": "+919833333333",
        "address": "4 Park Street",
        "city": "Kolkata",
        "state": "WB",
        "pincode": "700016",
        "emergency_contact_name": "Mira Das",
        "emergency_contact_phone": "+919833333334"
    });

    // Patients may not create patient records
    let response = app
        .clone()
        .oneshot(send_json("POST", "/patients", Some(&patient_auth), &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(send_json("POST", "/patients", Some(&nurse_auth), &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    assert_eq!(created["full_name"], "Rohan Das");
    let patient_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get(&format!("/patients/{}", patient_id), Some(&nurse_auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/patients/not-a-uuid", Some(&nurse_auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get(
            "/patients/00000000-0000-0000-0000-000000000000",
            Some(&nurse_auth),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["code"], "NOT_FOUND");

    // Payroll and audit logs are admin only
    let response = app
        .clone()
        .oneshot(get("/payroll", Some(&nurse_auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(get("/audit-logs?resource_type=patient", Some(&admin_auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let logs = read_json(response).await;
    assert_eq!(logs.as_array().map(Vec::len), Some(1));
    assert_eq!(logs[0]["user_id"], nurse.id.to_string());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_http_shift_rules(pool: PgPool) {
    let state = state_from_pool(pool);
    let app = api::router(state.clone());
    let admin = create_user(&state, "admin@hospital.test", UserRole::Admin).await;
    let nurse = create_user(&state, "nurse@hospital.test", UserRole::Nurse).await;
    let admin_auth = bearer(&state, admin.id);
    let nurse_auth = bearer(&state, nurse.id);

    let payload = |code: &str| {
        json!({
            "shift_name": "Night cover",
            "shift_code": code,
            "shift_type": "night",
            "start_time": "22:00:00",
            "end_time": "06:00:00"
        })
    };

    let response = app
        .clone()
        .oneshot(send_json("POST", "/shifts", Some(&admin_auth), &payload("night")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(send_json("POST", "/shifts", Some(&nurse_auth), &payload("NGT")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(send_json("POST", "/shifts", Some(&admin_auth), &payload("NGT")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    assert_eq!(created["duration_hours"], 8);

    let response = app
        .clone()
        .oneshot(get("/shifts", Some(&nurse_auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await.as_array().map(Vec::len), Some(1));
}
