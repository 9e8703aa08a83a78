//! Fixed message templates. Pure formatting, no delivery concerns.

pub const PRODUCT_LINK: &str =
    "https://drive.google.com/uc?export=download&id=1oWz2RmkM69kRAH5lpeEK85J7L4nJW9uo";

/// Payment-instructions menu. The chat id only appears through the
/// `EBOOK-<chatId>` reference code the buyer quotes on manual payments.
pub fn payment_menu(chat_id: &str) -> String {
    format!(
        "📚 <b>Ebook Digital - 15 USD</b>\n\n\
        elige tu método de pago:\n\n\
        🪙 <b>Cripto (USDT)</b>\n\
        → Pago automático, recibes el ebook al instante.\n\
        → Escribe: <code>/cripto</code>\n\n\
        🇪🇸 <b>Transferencia SEPA (España)</b>\n\
        → Titular: TU NOMBRE\n\
        → IBAN: ESXX XXXX XXXX XXXX XXXX\n\
        → Concepto: <code>EBOOK-{chat_id}</code>\n\
        → Envía comprobante después de pagar.\n\n\
        🇪🇨 <b>Transferencia (Ecuador)</b>\n\
        → Banco: Pichincha\n\
        → Cuenta: 2214543269\n\
        → Referencia: <code>EBOOK-{chat_id}</code>\n\
        → Envía comprobante aquí.\n\n\
        🔷 <b>PayPal</b>\n\
        → Envía 15 USD a: theorkhon@gmail.com\n\
        → En la nota, escribe: <code>EBOOK-{chat_id}</code>\n\
        → Te enviaré el ebook manualmente."
    )
}

pub fn payment_link(payment_url: &str) -> String {
    format!(
        "🔗 <b>Paga en USDT:</b>\n{payment_url}\n\n\
        ✅ Al confirmarse, recibirás tu ebook automáticamente."
    )
}

pub fn payment_failed() -> &'static str {
    "❌ Error al generar enlace. Inténtalo más tarde."
}

pub fn download_link() -> String {
    format!("✅ ¡Pago confirmado!\n\nDescarga tu ebook:\n{PRODUCT_LINK}")
}
