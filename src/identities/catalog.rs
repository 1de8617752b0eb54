//! Identity catalogs of the supported Hadoop distributions

use crate::domain::model::MemberRef;
use crate::identities::Identities;
use crate::onefs::client::is_system_zone;

/// Identities needed by Cloudera Distribution including Hadoop
pub fn cdh_identities(zone: &str) -> Identities {
    let smoke_user = MemberRef::user("cloudera-scm");
    let hadoop = MemberRef::group("hadoop");

    let identities = Identities::new()
        .with_user("accumulo", "accumulo", &[])
        .with_user("anonymous", "anonymous", &[])
        .with_user("apache", "apache", &[])
        .with_user("cloudera-scm", "cloudera-scm", &[])
        .with_user("cmjobuser", "cmjobuser", &[])
        .with_user("flume", "flume", &[])
        .with_user("hbase", "hbase", &["hadoop", "supergroup"])
        .with_user("hdfs", "hdfs", &["hadoop", "supergroup"])
        .with_user("hive", "hive", &[])
        .with_user("HTTP", "HTTP", &["hadoop", "supergroup"])
        .with_user("httpfs", "httpfs", &[])
        .with_user("hue", "hue", &[])
        .with_user("impala", "impala", &["hive"])
        .with_user("kafka", "kafka", &[])
        .with_user("keytrustee", "keytrustee", &[])
        .with_user("kms", "kms", &[])
        .with_user("kudu", "kudu", &[])
        .with_user("llama", "llama", &[])
        .with_user("mapred", "mapred", &["hadoop", "supergroup"])
        .with_user("oozie", "oozie", &[])
        .with_user("sentry", "sentry", &[])
        .with_user("solr", "solr", &[])
        .with_user("spark", "spark", &[])
        .with_user("sqoop", "sqoop", &["sqoop2"])
        .with_user("sqoop2", "sqoop2", &["sqoop"])
        .with_user("yarn", "yarn", &["hadoop", "supergroup"])
        .with_user("zookeeper", "zookeeper", &[])
        .with_proxy_user("flume", &[smoke_user.clone(), hadoop.clone()])
        .with_proxy_user("hive", &[smoke_user.clone(), hadoop.clone()])
        .with_proxy_user("HTTP", &[smoke_user.clone()])
        .with_proxy_user("hue", &[smoke_user.clone(), hadoop.clone()])
        .with_proxy_user("impala", &[smoke_user.clone(), hadoop.clone()])
        .with_proxy_user("mapred", &[smoke_user.clone(), hadoop.clone()])
        .with_proxy_user("oozie", &[smoke_user, hadoop]);

    with_zone_admin(identities, zone)
}

/// Identities needed by Hortonworks Data Platform
pub fn hdp_identities(zone: &str) -> Identities {
    let smoke_user = MemberRef::user("ambari-qa");
    let hadoop = MemberRef::group("hadoop");

    let mut identities = Identities::new().with_user("anonymous", "anonymous", &[]);
    for user in [
        "accumulo",
        "activity_analyzer",
        "activity_explorer",
        "ambari-qa",
        "ambari-server",
        "ams",
        "atlas",
        "druid",
        "falcon",
        "flume",
        "gpadmin",
        "hadoopqa",
        "hbase",
        "hcat",
        "hdfs",
        "hive",
        "HTTP",
        "hue",
        "infra-solr",
        "kafka",
        "keyadmin",
        "kms",
        "knox",
        "livy",
        "logsearch",
        "mahout",
        "mapred",
        "oozie",
        "ranger",
        "rangerlookup",
        "spark",
        "sqoop",
        "storm",
        "tez",
        "tracer",
        "yarn",
        "yarn-ats",
        "yarn-ats-hbase",
        "zeppelin",
        "zookeeper",
    ] {
        identities = identities.with_user(user, user, &["hadoop"]);
    }

    for proxy_user in ["ambari-server", "HTTP", "knox"] {
        identities = identities.with_proxy_user(proxy_user, &[smoke_user.clone()]);
    }
    for proxy_user in ["flume", "hbase", "hcat", "hive", "livy", "oozie", "yarn"] {
        identities =
            identities.with_proxy_user(proxy_user, &[smoke_user.clone(), hadoop.clone()]);
    }

    with_zone_admin(identities, zone)
}

/// Zones other than System get their own `admin` user
fn with_zone_admin(identities: Identities, zone: &str) -> Identities {
    if is_system_zone(zone) {
        identities
    } else {
        identities.with_user("admin", "admin", &[])
    }
}
