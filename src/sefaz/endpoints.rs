//! Webservice endpoint routing.
//!
//! Each authorizing state runs its own webservice; states without one are
//! served by the SEFAZ Virtual do RS (SVRS). Routing is a data lookup per
//! `(service, state, environment)` with the SVRS entry as the fallback,
//! and the homologation and production tables never mix.

use crate::core::{Environment, Uf};

/// The webservice families the pipeline talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// NFeAutorizacao4 — batch authorization, receipt and protocol queries,
    /// service status, number invalidation.
    Autorizacao,
    /// NFeRecepcaoEvento4 — lifecycle events.
    Evento,
}

const AUTORIZACAO_HOMOLOGACAO: &[(Uf, &str)] = &[
    (Uf::Pr, "https://homologacao.nfce.fazenda.pr.gov.br/nfce/NFeAutorizacao4"),
    (Uf::Rs, "https://nfe-homologacao.sefazrs.rs.gov.br/ws/NfeAutorizacao/NFeAutorizacao4.asmx"),
    (Uf::Sc, "https://hom.nfe.fazenda.sc.gov.br/ws/NfeAutorizacao4"),
    (Uf::Sp, "https://homologacao.nfe.fazenda.sp.gov.br/ws/nfeautorizacao4.asmx"),
    (Uf::Rj, "https://nfe-homologacao.sefaz.rj.gov.br/NFeAutorizacao4"),
    (Uf::Mg, "https://hnfe.fazenda.mg.gov.br/nfe2/services/NFeAutorizacao4"),
    (Uf::Es, "https://homologacao.sefaz.es.gov.br/NFeAutorizacao4"),
    (Uf::Ba, "https://hnfe.sefaz.ba.gov.br/webservices/NFeAutorizacao4/NFeAutorizacao4.asmx"),
    (Uf::Ce, "https://nfeh.sefaz.ce.gov.br/nfe4/services/NFeAutorizacao4"),
    (Uf::Pe, "https://nfehomolog.sefaz.pe.gov.br/nfe-service/services/NFeAutorizacao4"),
    (Uf::Rn, "https://hom.nfe.rn.gov.br/ws/NFeAutorizacao4"),
    (Uf::Pb, "https://hom.nfe.pb.gov.br/NFeAutorizacao4"),
    (Uf::Al, "https://hom.nfe.sefaz.al.gov.br/NFeAutorizacao4"),
    (Uf::Se, "https://hom.nfe.sefaz.se.gov.br/NFeAutorizacao4"),
    (Uf::Ma, "https://hom.nfe.sefaz.ma.gov.br/NFeAutorizacao4"),
    (Uf::Pi, "https://hom.nfe.sefaz.pi.gov.br/NFeAutorizacao4"),
    (Uf::Am, "https://homnfe.sefaz.am.gov.br/services2/services/NFeAutorizacao4"),
    (Uf::Pa, "https://hom.nfe.sefa.pa.gov.br/NFeAutorizacao4"),
    (Uf::Ro, "https://homologacao.nfe.sefin.ro.gov.br/ws/NFeAutorizacao4"),
    (Uf::Ac, "https://hom.nfe.ac.gov.br/NFeAutorizacao4"),
    (Uf::Rr, "https://hom.nfe.rr.gov.br/NFeAutorizacao4"),
    (Uf::Ap, "https://hom.nfe.sefaz.ap.gov.br/NFeAutorizacao4"),
    (Uf::To, "https://hom.nfe.sefaz.to.gov.br/NFeAutorizacao4"),
    (Uf::Go, "https://homolog.sefaz.go.gov.br/nfe/services/NFeAutorizacao4"),
    (Uf::Mt, "https://homologacao.sefaz.mt.gov.br/nfews/v2/services/NfeAutorizacao4"),
    (Uf::Ms, "https://hom.nfe.sefaz.ms.gov.br/ws/NFeAutorizacao4"),
    (Uf::Df, "https://hom.nfe.fazenda.df.gov.br/NFeAutorizacao4"),
];

const AUTORIZACAO_HOMOLOGACAO_SVRS: &str =
    "https://nfe-homologacao.svrs.rs.gov.br/ws/NfeAutorizacao/NFeAutorizacao4.asmx";

const AUTORIZACAO_PRODUCAO: &[(Uf, &str)] = &[
    (Uf::Sp, "https://nfe.fazenda.sp.gov.br/ws/nfeautorizacao4.asmx"),
    (Uf::Rs, "https://nfe.sefazrs.rs.gov.br/ws/NfeAutorizacao/NFeAutorizacao4.asmx"),
    (Uf::Pr, "https://nfce.fazenda.pr.gov.br/nfce/NFeAutorizacao4"),
    (Uf::Mg, "https://nfe.fazenda.mg.gov.br/nfe2/services/NFeAutorizacao4"),
];

const AUTORIZACAO_PRODUCAO_SVRS: &str =
    "https://nfe.svrs.rs.gov.br/ws/NfeAutorizacao/NFeAutorizacao4.asmx";

const EVENTO_HOMOLOGACAO: &[(Uf, &str)] = &[
    (Uf::Sp, "https://homologacao.nfe.fazenda.sp.gov.br/ws/nferecepcaoevento4.asmx"),
    (Uf::Rs, "https://nfe-homologacao.sefazrs.rs.gov.br/ws/recepcaoevento/recepcaoevento4.asmx"),
    (Uf::Pr, "https://homologacao.nfce.fazenda.pr.gov.br/nfce/NFeRecepcaoEvento4"),
    (Uf::Mg, "https://hnfe.fazenda.mg.gov.br/nfe2/services/NFeRecepcaoEvento4"),
    (Uf::Rj, "https://nfe-homologacao.sefaz.rj.gov.br/NFeRecepcaoEvento4"),
];

const EVENTO_HOMOLOGACAO_SVRS: &str =
    "https://nfe-homologacao.svrs.rs.gov.br/ws/recepcaoevento/recepcaoevento4.asmx";

const EVENTO_PRODUCAO: &[(Uf, &str)] = &[
    (Uf::Sp, "https://nfe.fazenda.sp.gov.br/ws/nferecepcaoevento4.asmx"),
    (Uf::Rs, "https://nfe.sefazrs.rs.gov.br/ws/recepcaoevento/recepcaoevento4.asmx"),
];

const EVENTO_PRODUCAO_SVRS: &str =
    "https://nfe.svrs.rs.gov.br/ws/recepcaoevento/recepcaoevento4.asmx";

/// Resolve the endpoint for a state, falling back to SVRS when the state
/// runs no webservice of its own.
pub fn endpoint_for(service: Service, uf: Uf, environment: Environment) -> &'static str {
    let (table, fallback) = match (service, environment) {
        (Service::Autorizacao, Environment::Homologacao) => {
            (AUTORIZACAO_HOMOLOGACAO, AUTORIZACAO_HOMOLOGACAO_SVRS)
        }
        (Service::Autorizacao, Environment::Producao) => {
            (AUTORIZACAO_PRODUCAO, AUTORIZACAO_PRODUCAO_SVRS)
        }
        (Service::Evento, Environment::Homologacao) => {
            (EVENTO_HOMOLOGACAO, EVENTO_HOMOLOGACAO_SVRS)
        }
        (Service::Evento, Environment::Producao) => (EVENTO_PRODUCAO, EVENTO_PRODUCAO_SVRS),
    };
    table
        .iter()
        .find(|(u, _)| *u == uf)
        .map(|(_, url)| *url)
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environments_never_mix() {
        for uf in (11..=53).filter_map(Uf::from_code) {
            let hom = endpoint_for(Service::Autorizacao, uf, Environment::Homologacao);
            let prod = endpoint_for(Service::Autorizacao, uf, Environment::Producao);
            assert_ne!(hom, prod, "{uf} resolved the same URL in both environments");
        }
    }

    #[test]
    fn unlisted_state_falls_back_to_svrs() {
        assert_eq!(
            endpoint_for(Service::Autorizacao, Uf::Go, Environment::Producao),
            AUTORIZACAO_PRODUCAO_SVRS
        );
        assert_eq!(
            endpoint_for(Service::Evento, Uf::Ba, Environment::Producao),
            EVENTO_PRODUCAO_SVRS
        );
    }

    #[test]
    fn listed_state_resolves_directly() {
        assert_eq!(
            endpoint_for(Service::Autorizacao, Uf::Sp, Environment::Producao),
            "https://nfe.fazenda.sp.gov.br/ws/nfeautorizacao4.asmx"
        );
    }

    #[test]
    fn all_endpoints_are_https() {
        for (_, url) in AUTORIZACAO_HOMOLOGACAO
            .iter()
            .chain(AUTORIZACAO_PRODUCAO)
            .chain(EVENTO_HOMOLOGACAO)
            .chain(EVENTO_PRODUCAO)
        {
            assert!(url.starts_with("https://"));
        }
    }
}
