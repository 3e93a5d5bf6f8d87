//! End-to-end tests of the back office.
//!
//! Operation → Store transaction → commit → EventBus
//!
//! Verifies:
//! - Lot draw order, LIFO release and stock conservation
//! - Markup, settlement and commission arithmetic
//! - Exact reversal on cancel, write-off and approval
//! - Failed operations leave no state and publish nothing

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use petalerp_accounting::{Reason, Subject};
    use petalerp_approval::ApprovalSubject;
    use petalerp_assembly::AssemblyStatus;
    use petalerp_core::{
        AssemblyCategoryId, AssemblyId, DomainError, LotId, PaymentMethodId, ProductId, UserId,
        WorkerId,
    };
    use petalerp_events::{EventBus, InMemoryEventBus, Subscription};
    use petalerp_inventory::LineRef;
    use petalerp_parties::WorkerKind;
    use petalerp_sales::{OrderStatus, PaymentDirection};

    use crate::{BackOffice, BackOfficeConfig, BackOfficeError, Envelope, NewPayment};

    type Office = BackOffice<Arc<InMemoryEventBus<Envelope>>>;

    struct Shop {
        office: Office,
        events: Subscription<Envelope>,
        roses: ProductId,
        bouquets: AssemblyCategoryId,
        cash: PaymentMethodId,
        florist: WorkerId,
        salesman: WorkerId,
        manager: UserId,
    }

    /// Registers reference data and subscribes to the bus before any lot exists.
    fn setup() -> Shop {
        petalerp_observability::init_for_tests();

        let bus: Arc<InMemoryEventBus<Envelope>> = Arc::new(InMemoryEventBus::new());
        let events = bus.subscribe();
        let office = BackOffice::new(BackOfficeConfig::default(), bus);

        let stems = office
            .register_product_category("stems".to_string(), true)
            .unwrap();
        let roses = office.register_product("red rose".to_string(), stems).unwrap();
        let bouquets = office
            .register_assembly_category("bouquets".to_string(), 10, 10, 300)
            .unwrap();
        let cash = office.register_payment_method("cash".to_string()).unwrap();
        let florist = office
            .register_worker("iris".to_string(), WorkerKind::Florist, None)
            .unwrap();
        let salesman = office
            .register_worker("sam".to_string(), WorkerKind::Salesman, None)
            .unwrap();
        events.drain();

        Shop {
            office,
            events,
            roses,
            bouquets,
            cash,
            florist,
            salesman,
            manager: UserId::new(),
        }
    }

    fn income(shop: &Shop, amount: i64) -> NewPayment {
        NewPayment {
            method_id: shop.cash,
            direction: PaymentDirection::Income,
            amount,
        }
    }

    fn lot_qty(shop: &Shop, lot: LotId) -> i64 {
        shop.office.lot(lot).unwrap().quantity()
    }

    fn event_types(shop: &Shop) -> Vec<String> {
        shop.events
            .drain()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect()
    }

    /// Lot X: 10 @ cost 5, lot Y: 5 @ cost 6, both priced 10.
    fn two_lots(shop: &Shop) -> (LotId, LotId) {
        let x = shop.office.receive_lot(shop.roses, 10, 5, 10).unwrap();
        let y = shop.office.receive_lot(shop.roses, 5, 6, 10).unwrap();
        (x, y)
    }

    /// A FINISHED bouquet whose single line has a subtotal of 100.
    fn finished_bouquet(shop: &Shop) -> AssemblyId {
        let lot = shop.office.receive_lot(shop.roses, 20, 4, 10).unwrap();
        let assembly = shop
            .office
            .create_assembly("spring".to_string(), shop.bouquets, Some(shop.florist))
            .unwrap();
        shop.office.add_assembly_line(assembly, lot, 10, None).unwrap();
        shop.office.finish_assembly(assembly).unwrap();
        assembly
    }

    #[test]
    fn order_line_draws_oldest_lot_first() {
        let shop = setup();
        let (x, y) = two_lots(&shop);
        let order = shop.office.create_order(None, None).unwrap();

        let line = shop
            .office
            .add_order_line(order, shop.roses, 12, None, 0)
            .unwrap();

        let held: Vec<(LotId, i64, i64)> = shop
            .office
            .allocations(LineRef::Order(line))
            .unwrap()
            .iter()
            .map(|r| (r.lot_id, r.quantity, r.unit_cost))
            .collect();
        assert_eq!(held, vec![(x, 10, 5), (y, 2, 6)]);
        assert_eq!(lot_qty(&shop, x), 0);
        assert_eq!(lot_qty(&shop, y), 3);
        assert_eq!(shop.office.order(order).unwrap().totals().total, 120);
    }

    #[test]
    fn line_return_releases_most_recent_draw_first() {
        let shop = setup();
        let (x, y) = two_lots(&shop);
        let order = shop.office.create_order(None, None).unwrap();
        let line = shop
            .office
            .add_order_line(order, shop.roses, 12, None, 0)
            .unwrap();
        shop.office.complete_order(order, vec![]).unwrap();

        shop.office.return_order_line(order, line, 3).unwrap();

        assert_eq!(lot_qty(&shop, x), 1);
        assert_eq!(lot_qty(&shop, y), 5);
        let held: i64 = shop
            .office
            .allocations(LineRef::Order(line))
            .unwrap()
            .iter()
            .map(|r| r.quantity)
            .sum();
        assert_eq!(held, 9);
        assert_eq!(shop.office.order(order).unwrap().totals().total, 90);
    }

    #[test]
    fn finish_applies_markup_and_write_off_reverses_it() {
        let shop = setup();
        let assembly = finished_bouquet(&shop);

        let finished = shop.office.assembly(assembly).unwrap();
        assert_eq!(finished.totals().subtotal, 100);
        assert_eq!(finished.totals().price, 110);
        assert_eq!(finished.applied_charge(), 10);

        shop.office.write_off_assembly(assembly, shop.manager).unwrap();

        let written_off = shop.office.assembly(assembly).unwrap();
        assert_eq!(written_off.status(), AssemblyStatus::WrittenOff);
        assert_eq!(written_off.totals().price, 100);
        assert_eq!(written_off.applied_charge(), 0);
        assert_eq!(shop.office.worker_balance(shop.florist).unwrap(), 0);
    }

    #[test]
    fn settlement_debt_is_total_minus_discount_minus_paid() {
        let shop = setup();
        shop.office.receive_lot(shop.roses, 20, 5, 10).unwrap();
        let order = shop.office.create_order(None, None).unwrap();
        shop.office
            .add_order_line(order, shop.roses, 20, None, 0)
            .unwrap();
        shop.office.set_order_discount(order, 20).unwrap();

        shop.office
            .complete_order(order, vec![income(&shop, 150)])
            .unwrap();

        let totals = shop.office.order(order).unwrap().totals();
        assert_eq!(totals.total, 200);
        assert_eq!(totals.discount, 20);
        assert_eq!(totals.paid, 150);
        assert_eq!(totals.debt, 30);
    }

    #[test]
    fn accepted_write_off_request_reverses_markup_and_creation_pay() {
        let shop = setup();
        let assembly = finished_bouquet(&shop);
        assert_eq!(shop.office.worker_balance(shop.florist).unwrap(), 300);

        let request = shop
            .office
            .request_assembly_write_off(assembly, shop.manager)
            .unwrap();
        let pending = shop.office.approval(request).unwrap();
        assert_eq!(pending.initial_status, Some(AssemblyStatus::Finished));
        assert_eq!(
            shop.office.assembly(assembly).unwrap().status(),
            AssemblyStatus::Pending
        );

        shop.office
            .resolve_approval(request, true, shop.manager)
            .unwrap();

        let assembly = shop.office.assembly(assembly).unwrap();
        assert_eq!(assembly.status(), AssemblyStatus::WrittenOff);
        assert_eq!(assembly.totals().price, 100);
        assert_eq!(shop.office.worker_balance(shop.florist).unwrap(), 0);
        assert_eq!(shop.office.derived_worker_balance(shop.florist).unwrap(), 0);
    }

    #[test]
    fn denied_write_off_request_restores_status_and_keeps_markup() {
        let shop = setup();
        let assembly = finished_bouquet(&shop);
        let request = shop
            .office
            .request_assembly_write_off(assembly, shop.manager)
            .unwrap();

        shop.office
            .resolve_approval(request, false, shop.manager)
            .unwrap();

        let assembly = shop.office.assembly(assembly).unwrap();
        assert_eq!(assembly.status(), AssemblyStatus::Finished);
        assert_eq!(assembly.totals().price, 110);
        assert_eq!(shop.office.worker_balance(shop.florist).unwrap(), 300);
    }

    #[test]
    fn approval_is_answered_exactly_once() {
        let shop = setup();
        let assembly = finished_bouquet(&shop);
        let request = shop
            .office
            .request_assembly_write_off(assembly, shop.manager)
            .unwrap();
        shop.office
            .resolve_approval(request, false, shop.manager)
            .unwrap();

        let err = shop
            .office
            .resolve_approval(request, true, shop.manager)
            .unwrap_err();

        assert_eq!(err.domain(), Some(&DomainError::AlreadyAnswered(request)));
        assert_eq!(
            shop.office.assembly(assembly).unwrap().status(),
            AssemblyStatus::Finished
        );
    }

    #[test]
    fn second_open_request_for_same_assembly_is_rejected() {
        let shop = setup();
        let assembly = finished_bouquet(&shop);
        shop.office
            .request_assembly_write_off(assembly, shop.manager)
            .unwrap();

        let err = shop
            .office
            .request_assembly_return_to_created(assembly, shop.manager)
            .unwrap_err();

        assert!(matches!(
            err.domain(),
            Some(DomainError::DuplicateOpenRequest(_))
        ));
        assert!(shop
            .office
            .open_approval(ApprovalSubject::Assembly(assembly))
            .unwrap()
            .is_some());
    }

    #[test]
    fn accepted_return_to_created_reopens_assembly_without_markup() {
        let shop = setup();
        let assembly = finished_bouquet(&shop);
        let request = shop
            .office
            .request_assembly_return_to_created(assembly, shop.manager)
            .unwrap();

        shop.office
            .resolve_approval(request, true, shop.manager)
            .unwrap();

        let reopened = shop.office.assembly(assembly).unwrap();
        assert_eq!(reopened.status(), AssemblyStatus::Created);
        assert_eq!(reopened.totals().price, 100);
        assert_eq!(shop.office.worker_balance(shop.florist).unwrap(), 0);

        shop.office.finish_assembly(assembly).unwrap();
        assert_eq!(shop.office.worker_balance(shop.florist).unwrap(), 300);
    }

    #[test]
    fn failed_multi_lot_draw_leaves_no_trace() {
        let shop = setup();
        let a = shop.office.receive_lot(shop.roses, 3, 5, 10).unwrap();
        let b = shop.office.receive_lot(shop.roses, 4, 5, 10).unwrap();
        let order = shop.office.create_order(None, None).unwrap();
        shop.events.drain();

        let err = shop
            .office
            .add_order_line(order, shop.roses, 10, None, 0)
            .unwrap_err();

        assert!(matches!(
            err.domain(),
            Some(DomainError::InsufficientStock { requested: 10, .. })
        ));
        assert_eq!(lot_qty(&shop, a), 3);
        assert_eq!(lot_qty(&shop, b), 4);
        assert!(shop.office.order(order).unwrap().lines().is_empty());
        assert!(event_types(&shop).is_empty());
    }

    #[test]
    fn events_are_published_after_commit() {
        let shop = setup();

        let lot = shop.office.receive_lot(shop.roses, 5, 5, 10).unwrap();
        assert_eq!(event_types(&shop), vec!["inventory.lot.received"]);

        let rejected = shop.office.receive_lot(shop.roses, -1, 5, 10);
        assert!(matches!(rejected, Err(BackOfficeError::Domain(_))));
        assert!(event_types(&shop).is_empty());
        assert_eq!(lot_qty(&shop, lot), 5);
    }

    #[test]
    fn cancel_then_restore_reproduces_allocations_and_commission() {
        let shop = setup();
        let (x, y) = two_lots(&shop);
        let order = shop.office.create_order(None, Some(shop.salesman)).unwrap();
        shop.office
            .add_order_line(order, shop.roses, 12, None, 0)
            .unwrap();
        shop.office.complete_order(order, vec![]).unwrap();
        assert_eq!(shop.office.worker_balance(shop.salesman).unwrap(), 6);

        shop.office.cancel_order(order).unwrap();
        assert_eq!(shop.office.order(order).unwrap().status(), OrderStatus::Cancelled);
        assert_eq!((lot_qty(&shop, x), lot_qty(&shop, y)), (10, 5));
        assert_eq!(shop.office.worker_balance(shop.salesman).unwrap(), 0);

        shop.office.restore_order(order).unwrap();
        assert_eq!(shop.office.order(order).unwrap().status(), OrderStatus::Created);
        assert_eq!((lot_qty(&shop, x), lot_qty(&shop, y)), (0, 3));

        shop.office.complete_order(order, vec![]).unwrap();
        assert_eq!(shop.office.worker_balance(shop.salesman).unwrap(), 6);
    }

    #[test]
    fn ledger_is_symmetric_after_cancel() {
        let shop = setup();
        two_lots(&shop);
        let order = shop.office.create_order(None, Some(shop.salesman)).unwrap();
        let line = shop
            .office
            .add_order_line(order, shop.roses, 12, None, 0)
            .unwrap();
        shop.office.complete_order(order, vec![]).unwrap();
        shop.office.return_order_line(order, line, 2).unwrap();
        assert_eq!(shop.office.worker_balance(shop.salesman).unwrap(), 5);

        shop.office.cancel_order(order).unwrap();

        let entries = shop.office.ledger_entries(Subject::Order(order)).unwrap();
        assert!(entries.iter().all(|e| e.reason == Reason::SaleCommission));
        assert_eq!(entries.iter().map(|e| e.signed_amount()).sum::<i64>(), 0);
        assert_eq!(shop.office.worker_balance(shop.salesman).unwrap(), 0);
        assert_eq!(shop.office.derived_worker_balance(shop.salesman).unwrap(), 0);
    }

    #[test]
    fn restore_is_refused_while_returns_are_active() {
        let shop = setup();
        two_lots(&shop);
        let order = shop.office.create_order(None, None).unwrap();
        let line = shop
            .office
            .add_order_line(order, shop.roses, 4, None, 0)
            .unwrap();
        shop.office.complete_order(order, vec![]).unwrap();
        shop.office.return_order_line(order, line, 1).unwrap();
        shop.office.cancel_order(order).unwrap();

        let err = shop.office.restore_order(order).unwrap_err();

        assert_eq!(err.domain(), Some(&DomainError::HasReturns));
        assert_eq!(shop.office.order(order).unwrap().status(), OrderStatus::Cancelled);
    }

    #[test]
    fn assembly_sale_pays_florist_and_return_reverses_it() {
        let shop = setup();
        let assembly = finished_bouquet(&shop);
        let order = shop.office.create_order(None, None).unwrap();
        let sale = shop.office.add_assembly_sale(order, assembly).unwrap();
        assert_eq!(shop.office.order(order).unwrap().totals().total, 110);

        shop.office
            .complete_order(order, vec![income(&shop, 110)])
            .unwrap();
        assert_eq!(shop.office.assembly(assembly).unwrap().status(), AssemblyStatus::Sold);
        // creation fee plus 10% of the 110 sale price
        assert_eq!(shop.office.worker_balance(shop.florist).unwrap(), 311);

        shop.office.return_assembly_sale(order, sale).unwrap();

        assert_eq!(
            shop.office.assembly(assembly).unwrap().status(),
            AssemblyStatus::Finished
        );
        assert_eq!(shop.office.worker_balance(shop.florist).unwrap(), 300);
        assert_eq!(shop.office.order(order).unwrap().totals().total, 0);
    }

    #[test]
    fn direct_write_off_answers_the_open_request() {
        let shop = setup();
        let assembly = finished_bouquet(&shop);
        let request = shop
            .office
            .request_assembly_write_off(assembly, shop.manager)
            .unwrap();

        shop.office.write_off_assembly(assembly, shop.manager).unwrap();

        let answered = shop.office.approval(request).unwrap();
        assert!(answered.is_answered);
        assert!(answered.is_accepted);
        assert_eq!(
            shop.office.assembly(assembly).unwrap().status(),
            AssemblyStatus::WrittenOff
        );
        assert_eq!(shop.office.worker_balance(shop.florist).unwrap(), 0);
    }

    #[test]
    fn stock_write_off_waits_for_approval() {
        let shop = setup();
        let lot = shop.office.receive_lot(shop.roses, 10, 5, 10).unwrap();
        let request = shop
            .office
            .request_stock_write_off(lot, 4, shop.manager)
            .unwrap();
        assert_eq!(lot_qty(&shop, lot), 10);
        shop.events.drain();

        shop.office
            .resolve_approval(request, true, shop.manager)
            .unwrap();

        assert_eq!(lot_qty(&shop, lot), 6);
        assert_eq!(
            event_types(&shop),
            vec!["inventory.lot.written_off", "approval.resolved"]
        );
    }

    #[test]
    fn completing_an_order_moves_the_client_tier() {
        let shop = setup();
        shop.office.receive_lot(shop.roses, 600, 50, 100).unwrap();
        let client = shop.office.register_client("olga".to_string(), true).unwrap();
        let order = shop.office.create_order(Some(client), None).unwrap();
        shop.office
            .add_order_line(order, shop.roses, 600, None, 0)
            .unwrap();

        shop.office.complete_order(order, vec![]).unwrap();
        let client_after = shop.office.client(client).unwrap();
        assert_eq!(client_after.lifetime_purchases, 60_000);
        assert_eq!(client_after.discount_percent, 3);

        let next = shop.office.create_order(Some(client), None).unwrap();
        assert_eq!(shop.office.order(next).unwrap().discount_percent(), 3);

        shop.office.cancel_order(order).unwrap();
        assert_eq!(shop.office.client(client).unwrap().discount_percent, 0);
    }

    #[test]
    fn cancelling_takes_back_the_credit_given_at_completion() {
        let shop = setup();
        shop.office.receive_lot(shop.roses, 600, 50, 100).unwrap();
        let client = shop.office.register_client("olga".to_string(), true).unwrap();
        let order = shop.office.create_order(Some(client), None).unwrap();
        let line = shop
            .office
            .add_order_line(order, shop.roses, 600, None, 0)
            .unwrap();
        shop.office.complete_order(order, vec![]).unwrap();

        shop.office.return_order_line(order, line, 600).unwrap();
        assert_eq!(shop.office.order(order).unwrap().totals().net(), 0);
        assert_eq!(shop.office.client(client).unwrap().lifetime_purchases, 60_000);

        shop.office.cancel_order(order).unwrap();

        let client = shop.office.client(client).unwrap();
        assert_eq!(client.lifetime_purchases, 0);
        assert_eq!(client.discount_percent, 0);
        assert_eq!(shop.office.order(order).unwrap().credited_purchase(), 0);
    }

    #[test]
    fn piecemeal_order_returns_refund_the_discounted_line_exactly() {
        let shop = setup();
        shop.office.receive_lot(shop.roses, 3, 5, 10).unwrap();
        let order = shop.office.create_order(None, Some(shop.salesman)).unwrap();
        let line = shop
            .office
            .add_order_line(order, shop.roses, 3, None, 10)
            .unwrap();
        shop.office.complete_order(order, vec![income(&shop, 20)]).unwrap();

        for _ in 0..3 {
            shop.office.return_order_line(order, line, 1).unwrap();
        }

        let totals = shop.office.order(order).unwrap().totals();
        assert_eq!(totals.total, 0);
        assert_eq!(totals.debt, -20);
        assert_eq!(shop.office.worker_balance(shop.salesman).unwrap(), 0);
    }

    #[test]
    fn payments_are_refused_before_completion() {
        let shop = setup();
        shop.office.receive_lot(shop.roses, 5, 5, 10).unwrap();
        let order = shop.office.create_order(None, None).unwrap();
        shop.office
            .add_order_line(order, shop.roses, 5, None, 0)
            .unwrap();

        let err = shop
            .office
            .record_payment(order, income(&shop, 50))
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(DomainError::InvalidStateTransition { .. })
        ));

        shop.office.complete_order(order, vec![]).unwrap();
        shop.office.record_payment(order, income(&shop, 50)).unwrap();
        assert_eq!(shop.office.order(order).unwrap().totals().debt, 0);
    }

    #[test]
    fn changing_line_quantity_draws_and_releases_stock() {
        let shop = setup();
        let (x, y) = two_lots(&shop);
        let order = shop.office.create_order(None, None).unwrap();
        let line = shop
            .office
            .add_order_line(order, shop.roses, 4, None, 0)
            .unwrap();

        shop.office.change_order_line_qty(order, line, 12).unwrap();
        assert_eq!((lot_qty(&shop, x), lot_qty(&shop, y)), (0, 3));

        // releases y's 2 first, then 7 of x
        shop.office.change_order_line_qty(order, line, 3).unwrap();
        assert_eq!((lot_qty(&shop, x), lot_qty(&shop, y)), (7, 5));
        assert_eq!(shop.office.order(order).unwrap().totals().total, 30);
    }

    #[test]
    fn cancelling_a_line_return_needs_the_stock_back() {
        let shop = setup();
        let lot = shop.office.receive_lot(shop.roses, 10, 5, 10).unwrap();
        let order = shop.office.create_order(None, None).unwrap();
        let line = shop
            .office
            .add_order_line(order, shop.roses, 10, None, 0)
            .unwrap();
        shop.office.complete_order(order, vec![]).unwrap();
        let returned = shop.office.return_order_line(order, line, 4).unwrap();

        let other = shop.office.create_order(None, None).unwrap();
        shop.office
            .add_order_line(other, shop.roses, 4, None, 0)
            .unwrap();

        let err = shop
            .office
            .cancel_order_line_return(order, returned, shop.manager)
            .unwrap_err();

        assert!(matches!(
            err.domain(),
            Some(DomainError::InsufficientStock { requested: 4, .. })
        ));
        assert_eq!(lot_qty(&shop, lot), 0);
        let order = shop.office.order(order).unwrap();
        assert!(order.line_return(returned).unwrap().is_active());
        assert_eq!(order.totals().total, 60);
    }

    #[test]
    fn restore_fails_when_stock_was_sold_meanwhile() {
        let shop = setup();
        let (x, y) = two_lots(&shop);
        let order = shop.office.create_order(None, None).unwrap();
        shop.office
            .add_order_line(order, shop.roses, 12, None, 0)
            .unwrap();
        shop.office.cancel_order(order).unwrap();

        let other = shop.office.create_order(None, None).unwrap();
        shop.office
            .add_order_line(other, shop.roses, 10, None, 0)
            .unwrap();
        let before = (lot_qty(&shop, x), lot_qty(&shop, y));

        let err = shop.office.restore_order(order).unwrap_err();

        assert!(matches!(
            err.domain(),
            Some(DomainError::InsufficientStock { .. })
        ));
        assert_eq!(shop.office.order(order).unwrap().status(), OrderStatus::Cancelled);
        assert_eq!((lot_qty(&shop, x), lot_qty(&shop, y)), before);
    }

    #[test]
    fn restore_fails_when_sold_assembly_is_no_longer_finished() {
        let shop = setup();
        let assembly = finished_bouquet(&shop);
        let order = shop.office.create_order(None, None).unwrap();
        shop.office.add_assembly_sale(order, assembly).unwrap();
        shop.office.complete_order(order, vec![]).unwrap();
        shop.office.cancel_order(order).unwrap();
        shop.office.write_off_assembly(assembly, shop.manager).unwrap();

        let err = shop.office.restore_order(order).unwrap_err();

        assert!(matches!(
            err.domain(),
            Some(DomainError::InvalidStateTransition { .. })
        ));
        assert_eq!(shop.office.order(order).unwrap().status(), OrderStatus::Cancelled);
        assert_eq!(
            shop.office.assembly(assembly).unwrap().status(),
            AssemblyStatus::WrittenOff
        );
    }

    #[test]
    fn assembly_line_return_and_its_cancellation_move_stock() {
        let shop = setup();
        let lot = shop.office.receive_lot(shop.roses, 20, 4, 10).unwrap();
        let assembly = shop
            .office
            .create_assembly("autumn".to_string(), shop.bouquets, Some(shop.florist))
            .unwrap();
        let line = shop.office.add_assembly_line(assembly, lot, 10, None).unwrap();

        let returned = shop
            .office
            .return_assembly_line(assembly, line, 3)
            .unwrap();
        assert_eq!(lot_qty(&shop, lot), 13);
        let totals = shop.office.assembly(assembly).unwrap().totals();
        assert_eq!((totals.subtotal, totals.cost), (70, 28));

        shop.office
            .cancel_assembly_return(assembly, returned, shop.manager)
            .unwrap();
        assert_eq!(lot_qty(&shop, lot), 10);
        assert_eq!(shop.office.assembly(assembly).unwrap().totals().subtotal, 100);
    }

    #[test]
    fn cancelling_an_assembly_return_needs_the_lot_stock() {
        let shop = setup();
        let lot = shop.office.receive_lot(shop.roses, 10, 4, 10).unwrap();
        let assembly = shop
            .office
            .create_assembly("autumn".to_string(), shop.bouquets, None)
            .unwrap();
        let line = shop.office.add_assembly_line(assembly, lot, 10, None).unwrap();
        let returned = shop
            .office
            .return_assembly_line(assembly, line, 3)
            .unwrap();
        let order = shop.office.create_order(None, None).unwrap();
        shop.office
            .add_order_line(order, shop.roses, 3, None, 0)
            .unwrap();

        let err = shop
            .office
            .cancel_assembly_return(assembly, returned, shop.manager)
            .unwrap_err();

        assert!(matches!(
            err.domain(),
            Some(DomainError::InsufficientStock { .. })
        ));
        assert_eq!(shop.office.assembly(assembly).unwrap().totals().subtotal, 70);
    }

    #[test]
    fn disassemble_returns_every_line_to_its_lot() {
        let shop = setup();
        let (x, y) = two_lots(&shop);
        let assembly = shop
            .office
            .create_assembly("mixed".to_string(), shop.bouquets, None)
            .unwrap();
        shop.office.add_assembly_line(assembly, x, 6, None).unwrap();
        shop.office.add_assembly_line(assembly, y, 5, None).unwrap();
        assert_eq!((lot_qty(&shop, x), lot_qty(&shop, y)), (4, 0));

        shop.office.disassemble(assembly).unwrap();

        assert_eq!((lot_qty(&shop, x), lot_qty(&shop, y)), (10, 5));
        assert_eq!(shop.office.snapshot().unwrap().stock.total_allocated(), 0);
        assert!(matches!(
            shop.office.assembly(assembly).unwrap_err().domain(),
            Some(DomainError::SubjectNotFound { .. })
        ));
    }

    #[test]
    fn finished_assemblies_cannot_be_disassembled() {
        let shop = setup();
        let assembly = finished_bouquet(&shop);

        let err = shop.office.disassemble(assembly).unwrap_err();

        assert!(matches!(
            err.domain(),
            Some(DomainError::InvalidStateTransition { .. })
        ));
        assert_eq!(
            shop.office.assembly(assembly).unwrap().status(),
            AssemblyStatus::Finished
        );
    }

    #[test]
    fn concurrent_orders_conserve_stock() {
        let shop = setup();
        let lot = shop.office.receive_lot(shop.roses, 100, 5, 10).unwrap();

        let (office, roses) = (&shop.office, shop.roses);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(move || {
                    for _ in 0..2 {
                        let order = office.create_order(None, None).unwrap();
                        office.add_order_line(order, roses, 5, None, 0).unwrap();
                    }
                });
            }
        });

        let state = shop.office.snapshot().unwrap();
        assert_eq!(lot_qty(&shop, lot), 20);
        assert_eq!(state.stock.total_allocated(), 80);
        assert_eq!(state.orders.len(), 16);
    }
}
