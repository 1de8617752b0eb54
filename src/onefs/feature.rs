//! OneFS Feature Flags
//!
//! Each feature is identified by the upgrade generation that introduced it
//! and a bit within that generation. A generation constant encodes the
//! release as `0xMMmmPP00` (e.g. `0x8010300` for 8.1.3).

use crate::domain::model::CommittedFeatures;
use serde::{Deserialize, Serialize};

/// Upgrade generations
pub mod gen {
    pub const INIT: u64 = 0x0000000;
    pub const JAWS: u64 = 0x7010100;
    pub const MOBY: u64 = 0x7020000;
    pub const ORCA: u64 = 0x7020100;
    pub const RIP0: u64 = 0x7030000;
    pub const RIP1: u64 = 0x7030100;
    pub const RIPT: u64 = 0x8000000;
    pub const HAPI: u64 = 0x8000100;
    pub const FRTR: u64 = 0x8010000;
    pub const NJMA: u64 = 0x8010100;
    pub const KANA: u64 = 0x8010200;
    pub const NDUU: u64 = 0x8010300;
    pub const PIPE: u64 = 0x8020000;
    pub const ERA1: u64 = 0x9000100;
}

macro_rules! features {
    ($($name:ident = ($gen:ident, $bit:expr),)*) => {
        /// A OneFS feature flag, for use with `Client::feature_is_supported`
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum OneFsFeature {
            $($name,)*
        }

        impl OneFsFeature {
            /// Every known feature
            pub const ALL: &'static [OneFsFeature] = &[$(OneFsFeature::$name,)*];

            /// The (generation, bit) pair identifying this feature
            pub fn value(self) -> (u64, u32) {
                match self {
                    $(OneFsFeature::$name => (gen::$gen, $bit),)*
                }
            }
        }
    };
}

features! {
    Forever = (INIT, 0),

    JawsRu = (JAWS, 0),

    MobyProtection = (MOBY, 0),
    MobySnapdelete = (MOBY, 1),
    MobyRu = (MOBY, 2),
    MobyUnfs = (MOBY, 3),
    MobyAuthUpgrade = (MOBY, 4),

    OrcaRu = (ORCA, 0),
    RiptConsistentHash = (ORCA, 1),

    RiptRbmVersioning = (RIP0, 0),

    BatchErrorDsr = (RIP1, 1),
    RiptideMediascan = (RIP1, 2),
    Ript8kInodes = (RIP1, 3),

    RiptDedupe = (RIPT, 0),
    RiptideTruncate = (RIPT, 1),
    RiptideChangelistcreate = (RIPT, 2),
    RiptGmpServices = (RIPT, 3),
    RiptNlm = (RIPT, 4),
    RiptideFsa = (RIPT, 5),
    RiptSmartpools = (RIPT, 6),
    RiptAuthUpgrade = (RIPT, 7),
    RiptCelogUpgrade = (RIPT, 8),

    HalfpipePartitionedPerformance = (HAPI, 0),
    HpJe = (HAPI, 1),
    HpWorm = (HAPI, 2),
    HpProxy = (HAPI, 3),
    HalfpipeContainers = (HAPI, 4),
    HpNeedsNduFlag = (HAPI, 5),
    HpRanger = (HAPI, 6),
    HpAmbariMetrics = (HAPI, 7),
    HpDatanodeWireEncryption = (HAPI, 8),

    FtSmartpools = (FRTR, 0),
    FrtMirroredJournal = (FRTR, 1),
    FrtLinSuperDriveQuorum = (FRTR, 2),
    FreightTrainsLayout = (FRTR, 3),
    FtEsrs = (FRTR, 4),
    FrtCompressedInodes = (FRTR, 5),
    FtrLicenseMigration = (FRTR, 6),

    PipeIterMark = (NJMA, 0),
    NiijimaCpoolGoogleXml = (NJMA, 1),
    NjmaHdfsInotify = (NJMA, 2),
    NjmaHdfsFsimage = (NJMA, 3),
    NiijimaClusterTime = (NJMA, 4),
    NiijimaSmb = (NJMA, 5),
    NiijimaEsrs = (NJMA, 6),

    KanaHdfsRefByInode = (KANA, 0),
    KanaWebhdfsDelegationTokens = (KANA, 1),

    PipeUapiOverrides = (NDUU, 0),

    PipeAuthAwsV4 = (PIPE, 0),
    PipeHangdump = (PIPE, 1),
    PipeGmpCfgGen = (PIPE, 2),
    PipeExtGroup = (PIPE, 3),
    PipeExtGroupMsg = (PIPE, 4),
    PipeJe = (PIPE, 5),
    PipeIfsDomains = (PIPE, 6),
    PipeCpoolSecureKey = (PIPE, 7),
    PipeCpoolC2s = (PIPE, 8),
    PipeIsiCerts = (PIPE, 9),
    PipeNdmp = (PIPE, 10),
    PipeZonedRoles = (PIPE, 11),
    FtJeZombie = (PIPE, 12),
    PipeCpoolGoogleXml = (PIPE, 13),
    PipeSiq = (PIPE, 14),
    PipeQuotasMs = (PIPE, 15),
    PipeQuotaUserContainers = (PIPE, 16),
    PipeTreedelete = (PIPE, 17),
    PipeDomainSnapshots = (PIPE, 18),
    PipeQuotaDdq = (PIPE, 19),
    PipeArrayd = (PIPE, 20),
    PipeFlexnetV4 = (PIPE, 21),
    PipeIsiDaemonIpv6 = (PIPE, 22),
    PipeJePrep = (PIPE, 23),
    PipeIfsLfn = (PIPE, 24),
    PipeSnapSchedTardis = (PIPE, 25),
    PipeDriveInterop = (PIPE, 26),
    PipeReadBlocks = (PIPE, 27),
    PipeIfsBcm = (PIPE, 28),
    PipeExtGrpSro = (PIPE, 29),
    PipeHdfsExtattr = (PIPE, 30),
    PipeCp2_0 = (PIPE, 31),
    PipeFilepolicy = (PIPE, 32),
    PipeCoalSuspAggr = (PIPE, 34),
    PipeSmartconnectDns = (PIPE, 35),
    PipePdmEncInattr = (PIPE, 36),
    PipeNdmpRedirector = (PIPE, 38),
    PipeIsiCbindD = (PIPE, 39),
    PipeSparsePunch = (PIPE, 41),
    PipeSshConfig = (PIPE, 42),
    PipeAuditEvents = (PIPE, 43),
    PipePurposedb = (PIPE, 45),
    PipeJeTreewalk = (PIPE, 47),

    Era1HdfsTde = (ERA1, 1),
    Era1QuotaApplogical = (ERA1, 4),
    Era1IdiVerifySnapid = (ERA1, 6),
    Era1CpoolAliyun = (ERA1, 7),
    Era1StfDummyLins = (ERA1, 8),
    Era1PdmCollect = (ERA1, 13),
    Era1McpMlist = (ERA1, 14),
    Era1NfsSchedConfig = (ERA1, 16),
    Era1AdsVops = (ERA1, 17),
    Era1GmpServiceLsass = (ERA1, 18),
    Era1SinlinLockOrder = (ERA1, 20),
    Era1LinMasterFlags = (ERA1, 23),
    Era1RemoteSysctlObject = (ERA1, 25),
    Era1LinBucketLock = (ERA1, 27),
    Era1PdmSnapgovRename = (ERA1, 34),
}

/// Check a feature against the committed feature set of a cluster.
///
/// A generation without explicit bit entries is supported when it is not
/// newer than the committed default generation. Otherwise each entry for
/// the generation covers 64 bits: entry `i` with offset `o` commits bit
/// `i * 64 + o`.
pub fn is_committed(feature: OneFsFeature, committed: &CommittedFeatures) -> bool {
    let (feature_gen, feature_bit) = feature.value();

    let entries: Vec<&[u32]> = committed
        .gen_bits
        .iter()
        .filter(|entry| entry.gen == feature_gen)
        .map(|entry| entry.bits.as_slice())
        .collect();

    if entries.is_empty() {
        return feature_gen <= committed.default_gen;
    }

    entries.iter().enumerate().any(|(index, offsets)| {
        offsets
            .iter()
            .any(|offset| u64::from(feature_bit) == index as u64 * 64 + u64::from(*offset))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::GenBits;

    fn committed(default_gen: u64, gen_bits: Vec<(u64, Vec<u32>)>) -> CommittedFeatures {
        CommittedFeatures {
            default_gen,
            gen_bits: gen_bits
                .into_iter()
                .map(|(gen, bits)| GenBits { gen, bits })
                .collect(),
        }
    }

    #[test]
    fn test_generation_without_entries_uses_default_gen() {
        let features = committed(gen::HAPI, vec![]);
        assert!(is_committed(OneFsFeature::Forever, &features));
        assert!(is_committed(OneFsFeature::HpRanger, &features));
        assert!(!is_committed(OneFsFeature::FtSmartpools, &features));
    }

    #[test]
    fn test_generation_entries_cover_64_bits_each() {
        let features = committed(gen::NJMA, vec![(gen::PIPE, vec![0, 5]), (gen::PIPE, vec![2])]);
        assert!(is_committed(OneFsFeature::PipeAuthAwsV4, &features));
        assert!(is_committed(OneFsFeature::PipeJe, &features));
        assert!(!is_committed(OneFsFeature::PipeExtGroup, &features));
        assert!(!is_committed(OneFsFeature::PipeGmpCfgGen, &features));

        let features = committed(gen::NJMA, vec![(gen::PIPE, vec![]), (gen::PIPE, vec![2])]);
        assert!(!is_committed(OneFsFeature::PipeGmpCfgGen, &features));
        assert!(!is_committed(OneFsFeature::PipeAuthAwsV4, &features));
    }

    #[test]
    fn test_feature_values() {
        assert_eq!(OneFsFeature::PipeUapiOverrides.value(), (0x8010300, 0));
        assert_eq!(OneFsFeature::Era1PdmSnapgovRename.value(), (0x9000100, 34));
        assert!(OneFsFeature::ALL.contains(&OneFsFeature::HpProxy));
    }
}
