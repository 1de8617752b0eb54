//! Directory catalogs of the supported Hadoop distributions

use crate::directories::HdfsDirectory;

fn with_suffix(mut directories: Vec<HdfsDirectory>, identity_suffix: Option<&str>) -> Vec<HdfsDirectory> {
    if let Some(suffix) = identity_suffix.filter(|suffix| !suffix.is_empty()) {
        for directory in &mut directories {
            directory.apply_identity_suffix(suffix);
        }
    }
    directories
}

/// Directories needed by Cloudera Distribution including Hadoop
pub fn cdh_directories(identity_suffix: Option<&str>) -> Vec<HdfsDirectory> {
    let directories = vec![
        HdfsDirectory::new("/", "hdfs", "hadoop", 0o755),
        HdfsDirectory::new("/hbase", "hbase", "hbase", 0o755),
        HdfsDirectory::new("/solr", "solr", "solr", 0o775),
        HdfsDirectory::new("/tmp", "hdfs", "supergroup", 0o1777),
        HdfsDirectory::new("/tmp/hive", "hive", "supergroup", 0o777),
        HdfsDirectory::new("/tmp/logs", "mapred", "hadoop", 0o1777),
        HdfsDirectory::new("/user", "hdfs", "supergroup", 0o755),
        HdfsDirectory::new("/user/flume", "flume", "flume", 0o775),
        HdfsDirectory::new("/user/hdfs", "hdfs", "hdfs", 0o755),
        HdfsDirectory::new("/user/history", "mapred", "hadoop", 0o777),
        HdfsDirectory::new("/user/hive", "hive", "hive", 0o775),
        HdfsDirectory::new("/user/hive/warehouse", "hive", "hive", 0o1777),
        HdfsDirectory::new("/user/hue", "hue", "hue", 0o755),
        HdfsDirectory::new(
            "/user/hue/.cloudera_manager_hive_metastore_canary",
            "hue",
            "hue",
            0o777,
        ),
        HdfsDirectory::new("/user/impala", "impala", "impala", 0o775),
        HdfsDirectory::new("/user/oozie", "oozie", "oozie", 0o775),
        HdfsDirectory::new("/user/spark", "spark", "spark", 0o751),
        HdfsDirectory::new("/user/spark/applicationHistory", "spark", "spark", 0o1777),
        HdfsDirectory::new("/user/sqoop2", "sqoop2", "sqoop", 0o775),
        HdfsDirectory::new("/user/yarn", "yarn", "yarn", 0o755),
    ];
    with_suffix(directories, identity_suffix)
}

/// Directories needed by Hortonworks Data Platform
pub fn hdp_directories(identity_suffix: Option<&str>) -> Vec<HdfsDirectory> {
    let directories = vec![
        HdfsDirectory::new("/", "hdfs", "hadoop", 0o755),
        HdfsDirectory::new("/app-logs", "yarn", "hadoop", 0o1777),
        HdfsDirectory::new("/app-logs/ambari-qa", "ambari-qa", "hadoop", 0o770),
        HdfsDirectory::new("/app-logs/ambari-qa/logs", "ambari-qa", "hadoop", 0o770),
        HdfsDirectory::new("/apps", "hdfs", "hadoop", 0o755),
        HdfsDirectory::new("/apps/accumulo", "accumulo", "hadoop", 0o750),
        HdfsDirectory::new("/apps/falcon", "falcon", "hdfs", 0o777),
        HdfsDirectory::new("/apps/hbase", "hdfs", "hadoop", 0o755),
        HdfsDirectory::new("/apps/hbase/data", "hbase", "hadoop", 0o775),
        HdfsDirectory::new("/apps/hbase/staging", "hbase", "hadoop", 0o711),
        HdfsDirectory::new("/apps/hive", "hdfs", "hdfs", 0o755),
        HdfsDirectory::new("/apps/hive/warehouse", "hive", "hdfs", 0o777),
        HdfsDirectory::new("/apps/tez", "tez", "hdfs", 0o755),
        HdfsDirectory::new("/apps/webhcat", "hcat", "hdfs", 0o755),
        HdfsDirectory::new("/ats", "yarn", "hdfs", 0o755),
        HdfsDirectory::new("/ats/done", "yarn", "hdfs", 0o775),
        HdfsDirectory::new("/atsv2", "yarn-ats", "hadoop", 0o755),
        HdfsDirectory::new("/mapred", "mapred", "hadoop", 0o755),
        HdfsDirectory::new("/mapred/system", "mapred", "hadoop", 0o755),
        HdfsDirectory::new("/system", "yarn", "hadoop", 0o755),
        HdfsDirectory::new("/system/yarn", "yarn", "hadoop", 0o755),
        HdfsDirectory::new("/system/yarn/node-labels", "yarn", "hadoop", 0o700),
        HdfsDirectory::new("/tmp", "hdfs", "hdfs", 0o1777),
        HdfsDirectory::new("/tmp/hive", "ambari-qa", "hdfs", 0o777),
        HdfsDirectory::new("/user", "hdfs", "hdfs", 0o755),
        HdfsDirectory::new("/user/ambari-qa", "ambari-qa", "hdfs", 0o770),
        HdfsDirectory::new("/user/hcat", "hcat", "hdfs", 0o755),
        HdfsDirectory::new("/user/hdfs", "hdfs", "hdfs", 0o755),
        HdfsDirectory::new("/user/hive", "hive", "hdfs", 0o700),
        HdfsDirectory::new("/user/hue", "hue", "hue", 0o755),
        HdfsDirectory::new("/user/oozie", "oozie", "hdfs", 0o775),
        HdfsDirectory::new("/user/yarn", "yarn", "hdfs", 0o755),
    ];
    with_suffix(directories, identity_suffix)
}
