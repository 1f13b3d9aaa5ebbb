#![cfg(feature = "evento")]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use notafiscal::core::*;
use notafiscal::evento::EventManager;
use notafiscal::sefaz::{RetryPolicy, SefazClient, Transport};
use rust_decimal_macros::dec;

struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<String, NfeError>>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(replies: Vec<Result<String, NfeError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for &ScriptedTransport {
    async fn post(&self, _url: &str, _body: &str) -> Result<String, NfeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(NfeError::Transport("script exhausted".into())))
    }
}

struct FakeSigner;

impl Signer for FakeSigner {
    fn sign(&self, xml: &str, _tenant_id: u32) -> Result<String, NfeError> {
        Ok(xml.to_string())
    }
}

fn event_accepted(sequence: u32) -> String {
    format!(
        r#"<retEnvEvento versao="1.00"><cStat>128</cStat><xMotivo>Lote de evento processado</xMotivo>
<retEvento versao="1.00"><infEvento>
<chNFe>35240611222333000181550010000000421123456789</chNFe>
<nSeqEvento>{sequence}</nSeqEvento>
<dhRegEvento>2024-06-15T12:00:00-03:00</dhRegEvento>
<nProt>1352400000{sequence:05}</nProt>
<cStat>135</cStat><xMotivo>Evento registrado e vinculado a NF-e</xMotivo>
</infEvento></retEvento></retEnvEvento>"#
    )
}

fn event_rejected() -> String {
    r#"<retEnvEvento versao="1.00"><cStat>128</cStat><xMotivo>Lote de evento processado</xMotivo>
<retEvento versao="1.00"><infEvento>
<cStat>573</cStat><xMotivo>Duplicidade de evento</xMotivo>
</infEvento></retEvento></retEnvEvento>"#
        .to_string()
}

fn issued_at() -> DateTime<FixedOffset> {
    FixedOffset::west_opt(3 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 15, 10, 30, 0)
        .unwrap()
}

fn authorized_nfe() -> Nfe {
    let address = Address {
        street: "Rua das Flores".into(),
        number: "100".into(),
        complement: None,
        district: "Centro".into(),
        municipality_code: "3550308".into(),
        municipality: "Sao Paulo".into(),
        uf: Uf::Sp,
        cep: "01001000".into(),
        phone: None,
    };
    let mut nfe = NfeBuilder::new(1, 42, issued_at())
        .numeric_code(12_345_678)
        .issuer(Issuer {
            cnpj: "11222333000181".into(),
            legal_name: "Aluforce Industria Ltda".into(),
            trading_name: None,
            address: address.clone(),
            state_registration: "123456789".into(),
            regime: TaxRegime::SimplesNacional,
        })
        .recipient(Recipient {
            id: RecipientId::Cnpj("04252011000110".into()),
            name: "Cliente SA".into(),
            address,
            state_registration: None,
            email: None,
        })
        .add_item(
            ItemDraft::new("P001", "Perfil de aluminio", "76042100", "5102", "KG")
                .quantity(dec!(10))
                .unit_price(dec!(25.50)),
        )
        .build()
        .unwrap();
    nfe.status = NfeStatus::Authorized;
    nfe.authorization = Some(Authorization {
        protocol: "135240000000123".into(),
        authorized_at: issued_at().with_timezone(&Utc),
    });
    nfe
}

fn manager<'a>(
    transport: &'a ScriptedTransport,
    store: Arc<InMemoryEvents>,
) -> EventManager<&'a ScriptedTransport, FakeSigner> {
    let log = Arc::new(InMemoryLog::new());
    let client = SefazClient::new(transport, log).with_retry_policy(RetryPolicy {
        attempts: 1,
        base_delay: Duration::from_millis(1),
        poll_attempts: 1,
        poll_initial_delay: Duration::from_millis(1),
        poll_interval: Duration::from_millis(1),
    });
    EventManager::new(client, FakeSigner, store)
}

fn hours_after_authorization(h: i64) -> DateTime<FixedOffset> {
    issued_at() + chrono::Duration::hours(h)
}

#[tokio::test]
async fn cancellation_within_window_cancels_the_document() {
    let transport = ScriptedTransport::new(vec![Ok(event_accepted(1))]);
    let store = Arc::new(InMemoryEvents::new());
    let mut nfe = authorized_nfe();

    let record = manager(&transport, store.clone())
        .cancel(
            &mut nfe,
            "cliente desistiu da compra antes do envio",
            hours_after_authorization(2),
            1,
        )
        .await
        .unwrap();

    assert_eq!(nfe.status, NfeStatus::Cancelled);
    assert_eq!(record.kind, EventKind::Cancelamento);
    assert_eq!(record.sequence, 1);
    assert_eq!(
        store.max_accepted_sequence(&nfe.access_key, EventKind::Cancelamento),
        1
    );
}

#[tokio::test]
async fn expired_window_fails_without_touching_the_network() {
    let transport = ScriptedTransport::new(vec![Ok(event_accepted(1))]);
    let store = Arc::new(InMemoryEvents::new());
    let mut nfe = authorized_nfe();

    let err = manager(&transport, store)
        .cancel(
            &mut nfe,
            "cliente desistiu da compra antes do envio",
            hours_after_authorization(25),
            1,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, NfeError::Deadline(_)));
    assert_eq!(transport.calls(), 0);
    assert_eq!(nfe.status, NfeStatus::Authorized);
}

#[tokio::test]
async fn short_justification_fails_locally() {
    let transport = ScriptedTransport::new(vec![]);
    let store = Arc::new(InMemoryEvents::new());
    let mut nfe = authorized_nfe();

    let err = manager(&transport, store)
        .cancel(&mut nfe, "curta", hours_after_authorization(1), 1)
        .await
        .unwrap_err();

    assert!(matches!(err, NfeError::Validation(_)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn oversized_justification_is_rejected_not_truncated() {
    let transport = ScriptedTransport::new(vec![Ok(event_accepted(1))]);
    let store = Arc::new(InMemoryEvents::new());
    let mut nfe = authorized_nfe();

    let err = manager(&transport, store.clone())
        .cancel(
            &mut nfe,
            &"cancelamento solicitado pelo cliente ".repeat(10),
            hours_after_authorization(1),
            1,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, NfeError::Validation(_)));
    assert_eq!(transport.calls(), 0);
    assert_eq!(nfe.status, NfeStatus::Authorized);

    // The correction bound at 1000 characters behaves the same way.
    let err = manager(&transport, store)
        .correct(
            &nfe,
            &"corrigir razao social do transportador ".repeat(30),
            hours_after_authorization(1),
            1,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, NfeError::Validation(_)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn non_authorized_document_cannot_be_cancelled() {
    let transport = ScriptedTransport::new(vec![]);
    let store = Arc::new(InMemoryEvents::new());
    let mut nfe = authorized_nfe();
    nfe.status = NfeStatus::Generated;
    nfe.authorization = None;

    let err = manager(&transport, store)
        .cancel(
            &mut nfe,
            "cliente desistiu da compra antes do envio",
            hours_after_authorization(1),
            1,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, NfeError::Conflict(_)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn correction_sequences_advance_only_on_acceptance() {
    let store = Arc::new(InMemoryEvents::new());
    let nfe = authorized_nfe();

    // First letter accepted.
    let transport = ScriptedTransport::new(vec![Ok(event_accepted(1))]);
    let record = manager(&transport, store.clone())
        .correct(
            &nfe,
            "corrigir razao social do transportador",
            hours_after_authorization(1),
            1,
        )
        .await
        .unwrap();
    assert_eq!(record.sequence, 1);

    // Second attempt rejected: no record, sequence not consumed.
    let transport = ScriptedTransport::new(vec![Ok(event_rejected())]);
    let err = manager(&transport, store.clone())
        .correct(
            &nfe,
            "corrigir razao social do transportador",
            hours_after_authorization(2),
            1,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, NfeError::Rejection { code: 573, .. }));
    assert_eq!(
        store.max_accepted_sequence(&nfe.access_key, EventKind::CartaCorrecao),
        1
    );

    // Retry re-uses sequence 2.
    let transport = ScriptedTransport::new(vec![Ok(event_accepted(2))]);
    let record = manager(&transport, store.clone())
        .correct(
            &nfe,
            "corrigir razao social do transportador",
            hours_after_authorization(3),
            1,
        )
        .await
        .unwrap();
    assert_eq!(record.sequence, 2);
}

#[tokio::test]
async fn twenty_first_correction_conflicts_before_transmission() {
    let store = Arc::new(InMemoryEvents::new());
    let nfe = authorized_nfe();
    for seq in 1..=20 {
        store.record(EventRecord {
            access_key: nfe.access_key.clone(),
            kind: EventKind::CartaCorrecao,
            sequence: seq,
            justification: "correcao registrada anteriormente".into(),
            protocol: format!("13524000000{seq:04}"),
            registered_at: Utc::now(),
        });
    }

    let transport = ScriptedTransport::new(vec![Ok(event_accepted(21))]);
    let err = manager(&transport, store)
        .correct(
            &nfe,
            "corrigir razao social do transportador",
            hours_after_authorization(1),
            1,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, NfeError::Conflict(_)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn cancelled_document_rejects_corrections() {
    let transport = ScriptedTransport::new(vec![]);
    let store = Arc::new(InMemoryEvents::new());
    let mut nfe = authorized_nfe();
    nfe.status = NfeStatus::Cancelled;

    let err = manager(&transport, store)
        .correct(
            &nfe,
            "corrigir razao social do transportador",
            hours_after_authorization(1),
            1,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, NfeError::Conflict(_)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn accented_justification_is_normalized_before_transmission() {
    let transport = ScriptedTransport::new(vec![Ok(event_accepted(1))]);
    let store = Arc::new(InMemoryEvents::new());
    let mut nfe = authorized_nfe();

    let record = manager(&transport, store)
        .cancel(
            &mut nfe,
            "emissão duplicada por falha de comunicação",
            hours_after_authorization(1),
            1,
        )
        .await
        .unwrap();

    assert_eq!(
        record.justification,
        "emissao duplicada por falha de comunicacao"
    );
}
