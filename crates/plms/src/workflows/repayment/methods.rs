use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The payment instruments offered by the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethodKind {
    Upi,
    Card,
    NetBanking,
}

impl PaymentMethodKind {
    /// Stable identifier used on the wire and in method selection.
    pub const fn id(self) -> &'static str {
        match self {
            PaymentMethodKind::Upi => "upi",
            PaymentMethodKind::Card => "card",
            PaymentMethodKind::NetBanking => "netbanking",
        }
    }

    pub fn from_id(raw: &str) -> Option<Self> {
        match raw {
            "upi" => Some(Self::Upi),
            "card" => Some(Self::Card),
            "netbanking" => Some(Self::NetBanking),
            _ => None,
        }
    }
}

/// Presentation metadata for a payment method entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub kind: PaymentMethodKind,
    pub display_name: &'static str,
    pub accent_color: &'static str,
    /// Icon for the method tile; UPI renders provider icons instead.
    pub icon_url: Option<&'static str>,
    /// Fallback letter shown when the icon cannot be loaded.
    pub monogram: char,
}

/// A UPI app the borrower can route the collect request through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub name: &'static str,
    pub icon_url: &'static str,
    pub monogram: char,
}

static METHODS: [MethodDescriptor; 3] = [
    MethodDescriptor {
        kind: PaymentMethodKind::Upi,
        display_name: "UPI Payment",
        accent_color: "#4285F4",
        icon_url: None,
        monogram: 'U',
    },
    MethodDescriptor {
        kind: PaymentMethodKind::Card,
        display_name: "Credit/Debit Card",
        accent_color: "#FF6B6B",
        icon_url: Some("https://cdn-icons-png.flaticon.com/512/179/179431.png"),
        monogram: 'C',
    },
    MethodDescriptor {
        kind: PaymentMethodKind::NetBanking,
        display_name: "Net Banking",
        accent_color: "#20B2AA",
        icon_url: Some("https://cdn-icons-png.flaticon.com/512/1057/1057098.png"),
        monogram: 'N',
    },
];

static UPI_PROVIDERS: [ProviderDescriptor; 4] = [
    ProviderDescriptor {
        name: "Google Pay",
        icon_url: "https://upload.wikimedia.org/wikipedia/commons/f/f2/Google_Pay_Logo.svg",
        monogram: 'G',
    },
    ProviderDescriptor {
        name: "PhonePe",
        icon_url: "https://upload.wikimedia.org/wikipedia/commons/0/04/PhonePe_Logo.svg",
        monogram: 'P',
    },
    ProviderDescriptor {
        name: "Paytm",
        icon_url: "https://upload.wikimedia.org/wikipedia/commons/2/24/Paytm_Logo_%28standalone%29.svg",
        monogram: 'P',
    },
    ProviderDescriptor {
        name: "BHIM UPI",
        icon_url: "https://upload.wikimedia.org/wikipedia/commons/8/8a/BHIM_UPI_Logo.svg",
        monogram: 'B',
    },
];

/// Every method the dialog offers, in display order.
pub fn available_methods() -> &'static [MethodDescriptor] {
    &METHODS
}

pub fn method_descriptor(kind: PaymentMethodKind) -> &'static MethodDescriptor {
    match kind {
        PaymentMethodKind::Upi => &METHODS[0],
        PaymentMethodKind::Card => &METHODS[1],
        PaymentMethodKind::NetBanking => &METHODS[2],
    }
}

/// UPI providers for methods that route through one.
///
/// Only [`PaymentMethodKind::Upi`] has providers; asking for any other
/// method is a caller bug surfaced as [`NotApplicableError`].
pub fn providers_for(
    kind: PaymentMethodKind,
) -> Result<&'static [ProviderDescriptor], NotApplicableError> {
    match kind {
        PaymentMethodKind::Upi => Ok(&UPI_PROVIDERS),
        other => Err(NotApplicableError(other.id())),
    }
}

/// Exact-name lookup of a UPI provider.
pub fn provider_named(name: &str) -> Option<&'static ProviderDescriptor> {
    UPI_PROVIDERS.iter().find(|provider| provider.name == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("payment method '{0}' does not route through a UPI provider")]
pub struct NotApplicableError(pub &'static str);
