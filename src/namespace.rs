//! namespace — таблица id → имя, собранная из item с nsIndex == 0.
//!
//! Ключ такого item — имя namespace, его U8-значение — определяемый id.
//! Разрешение откладывается до конца скана: определения на диске не обязаны
//! предшествовать первому использованию.

use log::{debug, warn};

use crate::item::{ItemBody, RawItem};
use crate::model::Namespace;
use crate::page::common::NS_INDEX_DEFINITIONS;

#[derive(Debug, Default, Clone)]
pub struct NamespaceResolver {
    // порядок встречи = порядок определения
    table: Vec<Namespace>,
}

impl NamespaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Является ли item определением namespace.
    pub fn is_definition(item: &RawItem) -> bool {
        item.ns_index == NS_INDEX_DEFINITIONS && matches!(item.body, ItemBody::U8(_))
    }

    /// Зарегистрировать определение. false — item не является определением.
    /// Повторное определение того же id заменяет имя (последняя запись побеждает).
    pub fn register(&mut self, item: &RawItem) -> bool {
        let ItemBody::U8(id) = item.body else {
            return false;
        };
        if item.ns_index != NS_INDEX_DEFINITIONS {
            return false;
        }
        if !item.crc_ok {
            warn!(
                "namespace '{}' -> {} defined by a suspect item: {}",
                item.key,
                id,
                item.warnings.join("; ")
            );
        }

        match self.table.iter_mut().find(|ns| ns.id == id) {
            Some(ns) if ns.name != item.key => {
                debug!("namespace {} renamed '{}' -> '{}'", id, ns.name, item.key);
                ns.name = item.key.clone();
            }
            Some(_) => {}
            None => {
                debug!("namespace '{}' -> {}", item.key, id);
                self.table.push(Namespace {
                    id,
                    name: item.key.clone(),
                });
            }
        }
        true
    }

    /// Имя по id; неизвестный id даёт синтетическое "unknown-<id>".
    pub fn resolve(&self, id: u8) -> String {
        self.table
            .iter()
            .find(|ns| ns.id == id)
            .map(|ns| ns.name.clone())
            .unwrap_or_else(|| format!("unknown-{}", id))
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.table
    }

    pub fn into_namespaces(self) -> Vec<Namespace> {
        self.table
    }
}
