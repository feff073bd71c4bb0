use std::fmt;

/// OPC UA status code.
///
/// The upper 16 bits carry severity and sub-code, the lower 16 bits carry
/// info bits such as the overflow flag of a queued data value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusCode(u32);

const SEVERITY_MASK: u32 = 0xC000_0000;
const CODE_MASK: u32 = 0xFFFF_0000;
const SEVERITY_UNCERTAIN: u32 = 0x4000_0000;
const SEVERITY_BAD: u32 = 0x8000_0000;

const INFO_TYPE_DATA_VALUE: u32 = 0x0000_0400;
const OVERFLOW_BIT: u32 = 0x0000_0080;
const SEMANTICS_CHANGED_BIT: u32 = 0x0000_4000;

macro_rules! status_codes {
    ($($name:ident = $value:literal, $text:literal;)*) => {
        impl StatusCode {
            $(pub const $name: StatusCode = StatusCode($value);)*

            /// Symbolic name of the code part, ignoring info bits.
            pub fn name(&self) -> Option<&'static str> {
                match self.0 & CODE_MASK {
                    $($value => Some($text),)*
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    GOOD = 0x0000_0000, "Good";
    GOOD_SUBSCRIPTION_TRANSFERRED = 0x002D_0000, "GoodSubscriptionTransferred";
    UNCERTAIN = 0x4000_0000, "Uncertain";
    BAD = 0x8000_0000, "Bad";
    BAD_UNEXPECTED_ERROR = 0x8001_0000, "BadUnexpectedError";
    BAD_INTERNAL_ERROR = 0x8002_0000, "BadInternalError";
    BAD_TIMEOUT = 0x800A_0000, "BadTimeout";
    BAD_SHUTDOWN = 0x800C_0000, "BadShutdown";
    BAD_NOTHING_TO_DO = 0x800F_0000, "BadNothingToDo";
    BAD_TOO_MANY_OPERATIONS = 0x8010_0000, "BadTooManyOperations";
    BAD_SESSION_ID_INVALID = 0x8025_0000, "BadSessionIdInvalid";
    BAD_SESSION_CLOSED = 0x8026_0000, "BadSessionClosed";
    BAD_SUBSCRIPTION_ID_INVALID = 0x8028_0000, "BadSubscriptionIdInvalid";
    BAD_NODE_ID_UNKNOWN = 0x8034_0000, "BadNodeIdUnknown";
    BAD_ATTRIBUTE_ID_INVALID = 0x8035_0000, "BadAttributeIdInvalid";
    BAD_INDEX_RANGE_INVALID = 0x8036_0000, "BadIndexRangeInvalid";
    BAD_INDEX_RANGE_NO_DATA = 0x8037_0000, "BadIndexRangeNoData";
    BAD_DATA_ENCODING_INVALID = 0x8038_0000, "BadDataEncodingInvalid";
    BAD_MONITORING_MODE_INVALID = 0x8041_0000, "BadMonitoringModeInvalid";
    BAD_MONITORED_ITEM_ID_INVALID = 0x8042_0000, "BadMonitoredItemIdInvalid";
    BAD_MONITORED_ITEM_FILTER_INVALID = 0x8043_0000, "BadMonitoredItemFilterInvalid";
    BAD_FILTER_NOT_ALLOWED = 0x8045_0000, "BadFilterNotAllowed";
    BAD_EVENT_FILTER_INVALID = 0x8047_0000, "BadEventFilterInvalid";
    BAD_BROWSE_NAME_INVALID = 0x8060_0000, "BadBrowseNameInvalid";
    BAD_TOO_MANY_SUBSCRIPTIONS = 0x8077_0000, "BadTooManySubscriptions";
    BAD_TOO_MANY_PUBLISH_REQUESTS = 0x8078_0000, "BadTooManyPublishRequests";
    BAD_NO_SUBSCRIPTION = 0x8079_0000, "BadNoSubscription";
    BAD_SEQUENCE_NUMBER_UNKNOWN = 0x807A_0000, "BadSequenceNumberUnknown";
    BAD_MESSAGE_NOT_AVAILABLE = 0x807B_0000, "BadMessageNotAvailable";
    BAD_SECURE_CHANNEL_CLOSED = 0x8086_0000, "BadSecureChannelClosed";
    BAD_DEADBAND_FILTER_INVALID = 0x808E_0000, "BadDeadbandFilterInvalid";
    BAD_TOO_MANY_MONITORED_ITEMS = 0x80DB_0000, "BadTooManyMonitoredItems";
}

impl StatusCode {
    pub const fn from_bits(bits: u32) -> Self {
        StatusCode(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// The status with every info bit stripped.
    pub const fn code(&self) -> StatusCode {
        StatusCode(self.0 & CODE_MASK)
    }

    pub const fn is_good(&self) -> bool {
        self.0 & SEVERITY_MASK == 0
    }

    pub const fn is_uncertain(&self) -> bool {
        self.0 & SEVERITY_MASK == SEVERITY_UNCERTAIN
    }

    pub const fn is_bad(&self) -> bool {
        self.0 & SEVERITY_BAD != 0
    }

    pub const fn with_overflow(self) -> Self {
        StatusCode(self.0 | INFO_TYPE_DATA_VALUE | OVERFLOW_BIT)
    }

    pub const fn has_overflow(&self) -> bool {
        self.0 & OVERFLOW_BIT != 0
    }

    pub const fn without_overflow(self) -> Self {
        StatusCode(self.0 & !OVERFLOW_BIT)
    }

    pub const fn with_semantics_changed(self) -> Self {
        StatusCode(self.0 | SEMANTICS_CHANGED_BIT)
    }

    pub const fn has_semantics_changed(&self) -> bool {
        self.0 & SEMANTICS_CHANGED_BIT != 0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.name() {
            Some(name) if self.0 & !CODE_MASK == 0 => write!(f, "{name}"),
            Some(name) => write!(f, "{name} (0x{:08X})", self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}
